/// Lifecycle controller for a field holding an ordered list of assets
use crate::{
    action::{self, MarkerMethod},
    asset::{AssetList, AssetRecord},
    config::{FieldConfig, StoreConfig},
    controller::single::SingleAssetController,
    error::{AssetError, AssetResult},
    form::{FieldKeys, FormSubmission, OwnerFields},
    plan::{BatchUpload, ListPlan},
    remote::RemoteStore,
    upload::UploadIntent,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What a submission did to a multi-asset field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOutcome {
    pub reordered: bool,
    /// Items spliced out without a remote call
    pub removed: Vec<String>,
    /// Items spliced out after a remote delete was attempted
    pub deleted: Vec<String>,
    /// Subset of `deleted` whose remote delete failed
    pub delete_failures: Vec<String>,
    /// Pre-resolved references appended
    pub referenced: usize,
    /// Public ids of files uploaded and appended, in submission order
    pub uploaded: Vec<String>,
    /// Zero-byte attachments that were dropped
    pub skipped: usize,
}

/// Drives an ordered list of assets
///
/// Per-item uploads and deletes go through a [`SingleAssetController`] for the
/// same field, so identifiers, validation and URLs match the single variant.
#[derive(Clone)]
pub struct MultiAssetController {
    items: SingleAssetController,
}

impl MultiAssetController {
    pub fn new(
        field: FieldConfig,
        store: StoreConfig,
        remote: Arc<dyn RemoteStore>,
    ) -> AssetResult<Self> {
        Ok(Self {
            items: SingleAssetController::new(field, store, remote)?,
        })
    }

    pub fn field(&self) -> &FieldConfig {
        self.items.field()
    }

    fn keys(&self) -> &FieldKeys {
        self.items.keys()
    }

    /// Parse a submission into a list plan
    ///
    /// Only the reference payload can fail to parse; malformed order keys and
    /// markers are ignored.
    pub fn plan(&self, form: &FormSubmission, owner: &dyn OwnerFields) -> AssetResult<ListPlan> {
        let keys = self.keys();

        let references = match form.value(&keys.uploads) {
            Some(raw) => parse_references(raw)?,
            None => Vec::new(),
        };

        let mut skipped_files = 0;
        let mut uploads = Vec::new();
        for (index, file) in form.files(&keys.upload).iter().enumerate() {
            if file.size_bytes == 0 {
                warn!("Skipping empty attachment {}", file.original_filename);
                skipped_files += 1;
                continue;
            }
            uploads.push(BatchUpload {
                position: index + 1,
                intent: UploadIntent::new(self.field(), file.clone(), owner),
            });
        }

        Ok(ListPlan {
            order: action::parse_order(form.value(&keys.order)),
            markers: action::parse_markers(form.value(&keys.action)),
            references,
            uploads,
            skipped_files,
        })
    }

    /// Apply a plan to `list`: reorder, removals, references, then uploads
    ///
    /// Every stage runs even when remote calls fail. A failed upload is reported
    /// as `BatchPartialFailure` once the whole batch settled; the list then
    /// already holds every other change of the submission, and the error
    /// carries the outcome describing them.
    pub async fn execute(&self, list: &mut AssetList, plan: ListPlan) -> AssetResult<ListOutcome> {
        let mut outcome = ListOutcome {
            skipped: plan.skipped_files,
            ..Default::default()
        };

        if let Some(order) = &plan.order {
            list.reorder(order);
            outcome.reordered = true;
            debug!("Reordered {} assets", list.len());
        }

        for marker in &plan.markers {
            for id in &marker.ids {
                match marker.method {
                    MarkerMethod::Remove => {
                        if self.remove(list, id).is_some() {
                            outcome.removed.push(id.clone());
                        }
                    }
                    MarkerMethod::Delete => {
                        if let Some(succeeded) = self.delete(list, id).await {
                            outcome.deleted.push(id.clone());
                            if !succeeded {
                                outcome.delete_failures.push(id.clone());
                            }
                        }
                    }
                }
            }
        }

        for reference in plan.references {
            list.push(reference);
            outcome.referenced += 1;
        }

        let failure = self.upload_batch(list, plan.uploads, &mut outcome).await;

        info!(
            removed = outcome.removed.len(),
            deleted = outcome.deleted.len(),
            referenced = outcome.referenced,
            uploaded = outcome.uploaded.len(),
            "Asset list updated"
        );

        match failure {
            Some((position, filename, error)) => Err(AssetError::BatchPartialFailure {
                index: position,
                filename,
                succeeded: outcome.uploaded.len(),
                source: Box::new(error),
                outcome: Box::new(outcome),
            }),
            None => Ok(outcome),
        }
    }

    /// Upload every file concurrently and append the successes in submission order
    ///
    /// Returns the first failure by submission position.
    async fn upload_batch(
        &self,
        list: &mut AssetList,
        uploads: Vec<BatchUpload>,
        outcome: &mut ListOutcome,
    ) -> Option<(usize, String, AssetError)> {
        if uploads.is_empty() {
            return None;
        }

        let items = &self.items;
        let results: Vec<(BatchUpload, AssetResult<AssetRecord>)> = stream::iter(uploads)
            .map(|upload| async move {
                let result = items.upload_asset(&upload.intent).await;
                (upload, result)
            })
            .buffered(self.field().upload_concurrency)
            .collect()
            .await;

        let mut failure = None;
        for (upload, result) in results {
            match result {
                Ok(asset) => {
                    outcome.uploaded.push(asset.public_id().to_string());
                    list.push(asset);
                }
                Err(e) => {
                    warn!(
                        "Upload of {} (file #{}) failed: {}",
                        upload.intent.file.original_filename, upload.position, e
                    );
                    if failure.is_none() {
                        failure = Some((upload.position, upload.intent.file.original_filename, e));
                    }
                }
            }
        }

        failure
    }

    /// Handle one form submission for this field
    #[instrument(skip_all, fields(field = %self.field().path))]
    pub async fn handle(
        &self,
        list: &mut AssetList,
        form: &FormSubmission,
        owner: &dyn OwnerFields,
    ) -> AssetResult<ListOutcome> {
        let plan = self.plan(form, owner)?;
        if plan.is_noop() && plan.skipped_files == 0 {
            return Ok(ListOutcome::default());
        }
        self.execute(list, plan).await
    }

    /// Splice an item out of the list, leaving its remote object alone
    pub fn remove(&self, list: &mut AssetList, public_id: &str) -> Option<AssetRecord> {
        let removed = list.take(public_id);
        if removed.is_none() {
            debug!("No asset {} to remove", public_id);
        }
        removed
    }

    /// Delete an item remotely (best effort) and splice it out of the list
    ///
    /// Returns `None` when no item has that id, otherwise whether the remote
    /// delete succeeded. The item leaves the list either way.
    pub async fn delete(&self, list: &mut AssetList, public_id: &str) -> Option<bool> {
        if list.position(public_id).is_none() {
            debug!("No asset {} to delete", public_id);
            return None;
        }

        let succeeded = match self.items.delete_remote(public_id).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Ignoring failed delete of list asset {}: {}", public_id, e);
                false
            }
        };
        list.take(public_id);
        Some(succeeded)
    }
}

/// Parse pre-resolved asset descriptors, skipping empty ones
///
/// A partially populated descriptor rejects the whole submission.
fn parse_references(raw: &str) -> AssetResult<Vec<AssetRecord>> {
    let records: Vec<AssetRecord> = serde_json::from_str(raw)
        .map_err(|e| AssetError::InvalidSubmission(format!("Invalid asset references: {}", e)))?;

    let mut references = Vec::with_capacity(records.len());
    for record in records {
        if record.is_empty() {
            warn!("Skipping asset reference without a public id");
            continue;
        }
        if !record.is_consistent() {
            return Err(AssetError::InvalidSubmission(format!(
                "Asset reference {} is missing its URLs",
                record.public_id()
            )));
        }
        references.push(record);
    }

    Ok(references)
}
