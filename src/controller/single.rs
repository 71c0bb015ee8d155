/// Lifecycle controller for a field holding at most one asset
use crate::{
    action::ActionToken,
    asset::{view, AssetRecord, AssetState},
    config::{FieldConfig, StoreConfig},
    error::{AssetError, AssetResult},
    form::{FieldKeys, FileDescriptor, FormSubmission, OwnerFields},
    plan::{PlannedMutation, RemoteOp, RequestPlan},
    remote::{DeleteOutcome, RemoteStore, UploadMetadata},
    upload::{self, UploadIntent},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// What a submission did to a single-asset field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleOutcome {
    Unchanged,
    /// Reference dropped, remote object kept
    Removed { public_id: String },
    /// Remote object destroyed and record emptied
    Deleted { public_id: String },
    Uploaded {
        public_id: String,
        /// Previous public id, when the upload replaced an asset
        replaced: Option<String>,
        /// Whether the replaced object was deleted remotely
        previous_deleted: bool,
    },
}

/// Drives the state machine of one optional asset
#[derive(Clone)]
pub struct SingleAssetController {
    field: FieldConfig,
    store: StoreConfig,
    remote: Arc<dyn RemoteStore>,
    keys: FieldKeys,
}

impl SingleAssetController {
    /// Create a controller; configuration problems surface here and never per request
    pub fn new(
        field: FieldConfig,
        store: StoreConfig,
        remote: Arc<dyn RemoteStore>,
    ) -> AssetResult<Self> {
        field.validate()?;
        store.validate()?;

        let keys = FieldKeys::new(&field.path);
        Ok(Self {
            field,
            store,
            remote,
            keys,
        })
    }

    pub fn field(&self) -> &FieldConfig {
        &self.field
    }

    pub fn keys(&self) -> &FieldKeys {
        &self.keys
    }

    /// Bucket this field stores objects in
    pub fn bucket(&self) -> &str {
        view::bucket(&self.field, &self.store)
    }

    /// State the submission puts the asset in
    pub fn state(&self, record: &AssetRecord, form: &FormSubmission) -> AssetState {
        let action = ActionToken::parse(form.value(&self.keys.action));
        classify(record, action, self.attached_file(form).is_some())
    }

    /// First non-empty file attached to the field
    fn attached_file<'a>(&self, form: &'a FormSubmission) -> Option<&'a FileDescriptor> {
        form.files(&self.keys.upload)
            .iter()
            .find(|file| file.size_bytes > 0)
    }

    /// Decide the remote operations for a submission without performing them
    pub fn plan(
        &self,
        record: &AssetRecord,
        form: &FormSubmission,
        owner: &dyn OwnerFields,
    ) -> AssetResult<RequestPlan> {
        let action = ActionToken::parse(form.value(&self.keys.action));
        let file = self.attached_file(form);
        let state = classify(record, action, file.is_some());

        let Some(file) = file else {
            return Ok(match state {
                AssetState::PendingDeletion => RequestPlan {
                    state,
                    ops: vec![RemoteOp::Delete {
                        key: record.public_id().to_string(),
                    }],
                    mutation: PlannedMutation::Reset,
                },
                AssetState::PendingRemoval => RequestPlan {
                    state,
                    ops: Vec::new(),
                    mutation: PlannedMutation::Reset,
                },
                _ => RequestPlan::unchanged(state),
            });
        };

        upload::validate_mime_type(file)?;

        let intent = UploadIntent::new(&self.field, file.clone(), owner);
        let mut ops = Vec::with_capacity(2);
        let clean_up = self.field.auto_cleanup || action == ActionToken::DeleteAsset;
        if !record.is_empty() && clean_up {
            ops.push(RemoteOp::Delete {
                key: record.public_id().to_string(),
            });
        }
        ops.push(RemoteOp::Upload(intent));

        Ok(RequestPlan {
            state,
            ops,
            mutation: PlannedMutation::ApplyUpload,
        })
    }

    /// Run a plan against the remote store, then apply its mutation to `record`
    ///
    /// Operations run one after another: a delete always settles before the
    /// upload that follows it starts. On any error the record is left as it was.
    pub async fn execute(
        &self,
        record: &mut AssetRecord,
        plan: RequestPlan,
    ) -> AssetResult<SingleOutcome> {
        if plan.is_noop() {
            return Ok(SingleOutcome::Unchanged);
        }

        let previous = Some(record.public_id().to_string()).filter(|id| !id.is_empty());
        let mut deleted: Option<String> = None;
        let mut uploaded: Option<AssetRecord> = None;

        for op in plan.ops {
            match op {
                RemoteOp::Delete { key } => {
                    self.delete_remote(&key).await?;
                    deleted = Some(key);
                }
                RemoteOp::Upload(intent) => match self.upload_asset(&intent).await {
                    Ok(asset) => uploaded = Some(asset),
                    Err(e) => {
                        return Err(match deleted {
                            Some(deleted_key) => AssetError::ReplacementLost {
                                deleted_key,
                                source: Box::new(e),
                            },
                            None => e,
                        })
                    }
                },
            }
        }

        let outcome = match (plan.mutation, uploaded) {
            (PlannedMutation::ApplyUpload, Some(asset)) => {
                let public_id = asset.public_id().to_string();
                *record = asset;
                SingleOutcome::Uploaded {
                    public_id,
                    previous_deleted: deleted.is_some(),
                    replaced: previous,
                }
            }
            (PlannedMutation::Reset, _) => {
                let public_id = record.public_id().to_string();
                record.reset();
                if deleted.is_some() {
                    SingleOutcome::Deleted { public_id }
                } else {
                    SingleOutcome::Removed { public_id }
                }
            }
            _ => SingleOutcome::Unchanged,
        };

        info!(field = %self.field.path, ?outcome, "Asset field updated");
        Ok(outcome)
    }

    /// Handle one form submission for this field
    #[instrument(skip_all, fields(field = %self.field.path))]
    pub async fn handle(
        &self,
        record: &mut AssetRecord,
        form: &FormSubmission,
        owner: &dyn OwnerFields,
    ) -> AssetResult<SingleOutcome> {
        let plan = self.plan(record, form, owner)?;
        debug!(state = ?plan.state, ops = plan.ops.len(), "Planned asset request");
        self.execute(record, plan).await
    }

    /// Destroy the stored asset and empty the record; a no-op on an empty record
    pub async fn delete(&self, record: &mut AssetRecord) -> AssetResult<Option<DeleteOutcome>> {
        if record.is_empty() {
            return Ok(None);
        }

        let outcome = self.delete_remote(record.public_id()).await?;
        record.reset();
        Ok(Some(outcome))
    }

    /// Drop the reference without touching the remote object
    pub fn remove(&self, record: &mut AssetRecord) {
        record.reset();
    }

    /// Delete one object; "already absent" counts as success
    pub async fn delete_remote(&self, key: &str) -> AssetResult<DeleteOutcome> {
        let outcome = self.remote.delete(self.bucket(), key).await?;
        if outcome == DeleteOutcome::NotFound {
            debug!("Object {} was already absent", key);
        }
        Ok(outcome)
    }

    /// Upload one file and build its complete record
    ///
    /// The MIME type is checked before the remote call. Dimensions are probed
    /// after the upload, so a probe failure leaves an orphaned object behind,
    /// reported as `InvalidImageData` with its key.
    pub async fn upload_asset(&self, intent: &UploadIntent) -> AssetResult<AssetRecord> {
        let file = &intent.file;
        upload::validate_mime_type(file)?;

        let data = file.read().await?;
        let metadata = UploadMetadata {
            original_filename: file.original_filename.clone(),
            mime_type: file.mime_type.clone(),
        };

        let receipt = self
            .remote
            .upload(self.bucket(), &intent.public_id, data.clone(), &metadata)
            .await?;

        let probe = tokio::task::spawn_blocking(move || upload::probe_dimensions(&data))
            .await
            .map_err(|e| e.to_string())
            .and_then(|probe| probe)
            .map_err(|message| AssetError::InvalidImageData {
                key: receipt.key.clone(),
                message,
            })?;

        let url = self.remote.build_url(&self.store.host, &receipt.key)?;
        let thumbnail_url = self.remote.build_thumbnail_url(&url);
        let (secure_url, secure_thumbnail_url) = match &self.store.secure_host {
            Some(secure_host) => {
                let secure_url = self.remote.build_url(secure_host, &receipt.key)?;
                let secure_thumbnail_url = self.remote.build_thumbnail_url(&secure_url);
                (secure_url, secure_thumbnail_url)
            }
            None => (String::new(), String::new()),
        };

        info!(
            "Uploaded {} as {} ({}x{}, {} bytes)",
            file.original_filename, receipt.key, probe.width, probe.height, receipt.size
        );

        Ok(AssetRecord {
            public_id: receipt.key,
            version: Utc::now().timestamp(),
            format: probe.format,
            mime_type: file.mime_type.clone(),
            original_filename: file.original_filename.clone(),
            extension: file.extension().to_string(),
            hash: receipt.hash,
            width: probe.width,
            height: probe.height,
            size_bytes: receipt.size,
            url,
            thumbnail_url,
            secure_url,
            secure_thumbnail_url,
        })
    }
}

/// State of one asset slot given the parsed action and whether a file came with it
pub fn classify(record: &AssetRecord, action: ActionToken, has_file: bool) -> AssetState {
    if has_file {
        return AssetState::PendingUpload;
    }

    match (record.is_empty(), action) {
        (true, _) => AssetState::Empty,
        (false, ActionToken::DeleteAsset) => AssetState::PendingDeletion,
        (false, ActionToken::RemoveAsset) => AssetState::PendingRemoval,
        (false, _) => AssetState::Existing,
    }
}
