/// Disk-based remote store
use crate::{
    error::{AssetError, AssetResult},
    remote::{DeleteOutcome, RemoteStore, UploadMetadata, UploadReceipt},
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, error};

/// Disk storage backend
///
/// Stores objects on the local filesystem as `{base}/{bucket}/{key}`. Keys may
/// contain `/`, which maps to subdirectories.
#[derive(Clone)]
pub struct DiskRemoteStore {
    base_path: PathBuf,
}

impl DiskRemoteStore {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for an object, refusing keys that escape the bucket
    fn object_path(&self, bucket: &str, key: &str) -> AssetResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || bucket.is_empty() || bucket.contains(['/', '\\']) {
            return Err(AssetError::remote(
                "resolve",
                key,
                format!("invalid object location {}/{}", bucket, key),
            ));
        }

        Ok(self.base_path.join(bucket).join(relative))
    }
}

#[async_trait]
impl RemoteStore for DiskRemoteStore {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        metadata: &UploadMetadata,
    ) -> AssetResult<UploadReceipt> {
        let path = self.object_path(bucket, key)?;

        debug!(
            "Writing object to disk: {} ({} bytes, type: {}, original: {})",
            path.display(),
            data.len(),
            metadata.mime_type,
            metadata.original_filename
        );

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create object directory: {}", e);
                AssetError::remote("upload", key, e)
            })?;
        }

        let size = data.len() as u64;
        let hash = hex::encode(Sha256::digest(&data));

        fs::write(&path, data).await.map_err(|e| {
            error!("Failed to write object {}: {}", key, e);
            AssetError::remote("upload", key, e)
        })?;

        Ok(UploadReceipt {
            key: key.to_string(),
            size,
            hash,
        })
    }

    async fn delete(&self, bucket: &str, key: &str) -> AssetResult<DeleteOutcome> {
        let path = self.object_path(bucket, key)?;

        debug!("Deleting object from disk: {}", path.display());

        match fs::remove_file(&path).await {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
            Err(e) => {
                error!("Failed to delete object {}: {}", key, e);
                Err(AssetError::remote("delete", key, e))
            }
        }
    }
}
