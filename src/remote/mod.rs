/// Remote Store
///
/// Object storage holding the image bytes. The controllers only ever upload
/// and delete objects by key; URLs are templated locally from the configured
/// hosts and never taken from the provider.

pub mod disk;
pub mod memory;
pub mod s3;

pub use disk::DiskRemoteStore;
pub use memory::{MemoryRemoteStore, RemoteEvent};
pub use s3::S3RemoteStore;

use crate::config::{StoreBackendConfig, StoreConfig};
use crate::error::{AssetError, AssetResult};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Side dimension of the fixed thumbnail view
pub const THUMBNAIL_SIZE: u32 = 128;

/// Metadata sent along with an upload
#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    pub original_filename: String,
    pub mime_type: String,
}

/// What the provider reports for a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub key: String,
    pub size: u64,
    /// Provider content hash
    pub hash: String,
}

/// Result of a delete; both variants mean the object is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Remote object store backend
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Store `data` under `key`, overwriting or rejecting as the provider sees fit
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        metadata: &UploadMetadata,
    ) -> AssetResult<UploadReceipt>;

    /// Remove the object at `key`; a missing object is not an error
    async fn delete(&self, bucket: &str, key: &str) -> AssetResult<DeleteOutcome>;

    /// Public URL of `key` under `host`
    fn build_url(&self, host: &str, key: &str) -> AssetResult<String> {
        build_url(host, key)
    }

    /// Thumbnail view of an object URL
    fn build_thumbnail_url(&self, url: &str) -> String {
        build_thumbnail_url(url)
    }
}

/// Resolve `key` against `host` as a relative reference
pub fn build_url(host: &str, key: &str) -> AssetResult<String> {
    let base = Url::parse(host).map_err(|e| AssetError::remote("build_url", key, e))?;
    let url = base
        .join(key)
        .map_err(|e| AssetError::remote("build_url", key, e))?;
    Ok(url.to_string())
}

/// Fixed 128x128 image view of `url`
pub fn build_thumbnail_url(url: &str) -> String {
    format!(
        "{}?imageView/1/w/{}/h/{}",
        url, THUMBNAIL_SIZE, THUMBNAIL_SIZE
    )
}

/// Create the backend named by the store configuration
pub async fn connect(config: &StoreConfig) -> AssetResult<Arc<dyn RemoteStore>> {
    config.validate()?;

    let store: Arc<dyn RemoteStore> = match &config.backend {
        StoreBackendConfig::Disk { location } => Arc::new(DiskRemoteStore::new(location.clone())),
        StoreBackendConfig::S3 {
            region,
            endpoint,
            access_key_id,
            secret_access_key,
        } => Arc::new(
            S3RemoteStore::new(s3::S3Config {
                region: region.clone(),
                endpoint: endpoint.clone(),
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
            })
            .await,
        ),
        StoreBackendConfig::Memory => Arc::new(MemoryRemoteStore::new()),
    };

    Ok(store)
}
