/// S3-compatible remote store
use crate::error::{AssetError, AssetResult};
use crate::remote::{DeleteOutcome, RemoteStore, UploadMetadata, UploadReceipt};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::delete_object::DeleteObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

/// S3 remote store
///
/// Supports AWS S3 and S3-compatible storage providers (MinIO, DigitalOcean Spaces, etc.)
#[derive(Clone)]
pub struct S3RemoteStore {
    client: Arc<Client>,
}

/// Connection settings for S3
#[derive(Debug, Clone)]
pub struct S3Config {
    /// AWS region (e.g., "us-east-1")
    pub region: String,

    /// Custom endpoint for S3-compatible services
    /// Example: "https://nyc3.digitaloceanspaces.com" or "http://localhost:9000"
    pub endpoint: Option<String>,

    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: String::new(),
            secret_access_key: String::new(),
        }
    }
}

impl S3RemoteStore {
    /// Create a new S3 remote store
    pub async fn new(config: S3Config) -> Self {
        info!("Initializing S3 remote store (region: {})", config.region);

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None, // session token
            None, // expiration
            "asset-lifecycle",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        if let Some(endpoint) = &config.endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint);
            // Required for MinIO and some S3-compatible services
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Self {
            client: Arc::new(client),
        }
    }
}

/// Whether a delete failed only because the object does not exist
///
/// Only a service response counts; transport and construction failures never do.
fn is_not_found<R>(err: &SdkError<DeleteObjectError, R>) -> bool {
    err.as_service_error()
        .and_then(|e| e.code())
        .is_some_and(|code| matches!(code, "NoSuchKey" | "NotFound"))
}

#[async_trait]
impl RemoteStore for S3RemoteStore {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        metadata: &UploadMetadata,
    ) -> AssetResult<UploadReceipt> {
        let size = data.len() as u64;

        debug!(
            "Uploading object to S3: {}/{} ({} bytes, type: {})",
            bucket, key, size, metadata.mime_type
        );

        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .metadata("originalname", metadata.original_filename.as_str());

        if !metadata.mime_type.is_empty() {
            request = request.content_type(metadata.mime_type.as_str());
        }

        let output = request.send().await.map_err(|e| {
            error!("Failed to upload object to S3: {}", e);
            AssetError::remote("upload", key, e)
        })?;

        Ok(UploadReceipt {
            key: key.to_string(),
            size,
            hash: output.e_tag().unwrap_or_default().trim_matches('"').to_string(),
        })
    }

    async fn delete(&self, bucket: &str, key: &str) -> AssetResult<DeleteOutcome> {
        debug!("Deleting object from S3: {}/{}", bucket, key);

        match self
            .client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(e) => {
                if is_not_found(&e) {
                    debug!("Object already absent in S3: {}", key);
                    Ok(DeleteOutcome::NotFound)
                } else {
                    error!("Failed to delete object from S3: {}", e);
                    Err(AssetError::remote("delete", key, e))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aws_sdk_s3::error::ErrorMetadata;
    use std::io;

    fn service_error(code: &str) -> SdkError<DeleteObjectError, ()> {
        let metadata = ErrorMetadata::builder().code(code).build();
        SdkError::service_error(DeleteObjectError::generic(metadata), ())
    }

    #[test]
    fn test_not_found_detection() {
        assert!(is_not_found(&service_error("NoSuchKey")));
        assert!(is_not_found(&service_error("NotFound")));
        assert!(!is_not_found(&service_error("AccessDenied")));
        assert!(!is_not_found(&service_error("NoSuchBucket")));
    }

    #[test]
    fn test_transport_not_found_is_a_failure() {
        let err: SdkError<DeleteObjectError, ()> = SdkError::construction_failure(
            io::Error::new(io::ErrorKind::NotFound, "credentials file not found"),
        );
        assert!(!is_not_found(&err));

        let err: SdkError<DeleteObjectError, ()> =
            SdkError::timeout_error(io::Error::new(io::ErrorKind::NotFound, "NotFound"));
        assert!(!is_not_found(&err));
    }

    #[test]
    fn test_s3_config_default() {
        let config = S3Config::default();
        assert_eq!(config.region, "us-east-1");
        assert!(config.endpoint.is_none());
    }
}
