/// Configuration management for asset fields and their remote store
use crate::error::{AssetError, AssetResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use url::Url;

/// Remote store configuration shared by every field that uploads to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Bucket holding the images
    pub bucket: String,
    /// Public base URL objects are served from
    pub host: String,
    /// Optional HTTPS base URL; secure URLs are only derived when set
    pub secure_host: Option<String>,
    pub backend: StoreBackendConfig,
}

/// Backend types for the remote store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoreBackendConfig {
    /// Objects stored on local disk, one directory per bucket
    Disk { location: PathBuf },

    /// S3-compatible object storage
    S3 {
        region: String,
        endpoint: Option<String>,
        access_key_id: String,
        secret_access_key: String,
    },

    /// In-process store, nothing survives the process
    Memory,
}

/// Per-field configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Storage path of the field on the owning record (also the form key stem)
    pub path: String,

    /// Bucket override; the store's bucket is used when unset
    pub bucket: Option<String>,

    /// Static prefix joined to every public id with `_`
    pub prefix: Option<String>,

    /// Delete the old remote object when the asset is replaced
    pub auto_cleanup: bool,

    /// Name of another field on the owning record whose value becomes the public id
    pub public_id_field: Option<String>,

    /// Use the original filename (without extension) as the public id
    pub filename_as_public_id: bool,

    /// Maximum concurrent uploads in one batch
    pub upload_concurrency: usize,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            path: "image".to_string(),
            bucket: None,
            prefix: None,
            auto_cleanup: false,
            public_id_field: None,
            filename_as_public_id: false,
            upload_concurrency: 4,
        }
    }
}

impl FieldConfig {
    /// Create a field configuration with defaults for everything but the path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Load field options from environment variables
    pub fn from_env(path: &str) -> AssetResult<Self> {
        dotenv::dotenv().ok();

        let bucket = env::var("ASSET_FIELD_BUCKET").ok().filter(|b| !b.is_empty());
        let prefix = env::var("ASSET_FIELD_PREFIX").ok().filter(|p| !p.is_empty());
        let auto_cleanup = env::var("ASSET_FIELD_AUTO_CLEANUP")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);
        let public_id_field = env::var("ASSET_FIELD_PUBLIC_ID_FIELD")
            .ok()
            .filter(|f| !f.is_empty());
        let filename_as_public_id = env::var("ASSET_FIELD_FILENAME_AS_PUBLIC_ID")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);
        let upload_concurrency = env::var("ASSET_FIELD_UPLOAD_CONCURRENCY")
            .unwrap_or_else(|_| "4".to_string())
            .parse()
            .map_err(|_| AssetError::Configuration("Invalid upload concurrency".to_string()))?;

        let config = FieldConfig {
            path: path.to_string(),
            bucket,
            prefix,
            auto_cleanup,
            public_id_field,
            filename_as_public_id,
            upload_concurrency,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> AssetResult<()> {
        if self.path.is_empty() {
            return Err(AssetError::Configuration(
                "Field path cannot be empty".to_string(),
            ));
        }

        if matches!(&self.bucket, Some(bucket) if bucket.is_empty()) {
            return Err(AssetError::Configuration(format!(
                "Field {} has an empty bucket override",
                self.path
            )));
        }

        if self.upload_concurrency == 0 {
            return Err(AssetError::Configuration(format!(
                "Field {} must allow at least one concurrent upload",
                self.path
            )));
        }

        Ok(())
    }
}

impl StoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AssetResult<Self> {
        dotenv::dotenv().ok();

        let bucket = env::var("ASSET_STORE_BUCKET")
            .map_err(|_| AssetError::Configuration("ASSET_STORE_BUCKET is required".to_string()))?;
        let host = env::var("ASSET_STORE_HOST")
            .map_err(|_| AssetError::Configuration("ASSET_STORE_HOST is required".to_string()))?;
        let secure_host = env::var("ASSET_STORE_SECURE_HOST")
            .ok()
            .filter(|h| !h.is_empty());

        let backend = if let Ok(region) = env::var("ASSET_STORE_S3_REGION") {
            StoreBackendConfig::S3 {
                region,
                endpoint: env::var("ASSET_STORE_S3_ENDPOINT").ok(),
                access_key_id: env::var("ASSET_STORE_S3_ACCESS_KEY_ID").map_err(|_| {
                    AssetError::Configuration("S3 access key required".to_string())
                })?,
                secret_access_key: env::var("ASSET_STORE_S3_SECRET_ACCESS_KEY").map_err(|_| {
                    AssetError::Configuration("S3 secret key required".to_string())
                })?,
            }
        } else {
            StoreBackendConfig::Disk {
                location: env::var("ASSET_STORE_DISK_LOCATION")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./data/assets")),
            }
        };

        let config = StoreConfig {
            bucket,
            host,
            secure_host,
            backend,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> AssetResult<()> {
        if self.bucket.is_empty() {
            return Err(AssetError::Configuration(
                "A bucket is required".to_string(),
            ));
        }

        parse_host("host", &self.host)?;
        if let Some(secure_host) = &self.secure_host {
            parse_host("secure host", secure_host)?;
        }

        Ok(())
    }
}

/// Hosts are bases that object keys get joined onto
fn parse_host(name: &str, value: &str) -> AssetResult<Url> {
    let url = Url::parse(value)
        .map_err(|e| AssetError::Configuration(format!("Invalid {} {:?}: {}", name, value, e)))?;
    if url.cannot_be_a_base() {
        return Err(AssetError::Configuration(format!(
            "Invalid {} {:?}: not usable as a base URL",
            name, value
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_config() -> StoreConfig {
        StoreConfig {
            bucket: "gallery".to_string(),
            host: "http://cdn.example.com/".to_string(),
            secure_host: None,
            backend: StoreBackendConfig::Memory,
        }
    }

    #[test]
    fn test_valid_store_config() {
        assert!(store_config().validate().is_ok());
    }

    #[test]
    fn test_missing_bucket_rejected() {
        let config = StoreConfig {
            bucket: String::new(),
            ..store_config()
        };
        assert!(matches!(config.validate(), Err(AssetError::Configuration(_))));
    }

    #[test]
    fn test_relative_host_rejected() {
        let config = StoreConfig {
            host: "cdn.example.com".to_string(),
            ..store_config()
        };
        assert!(matches!(config.validate(), Err(AssetError::Configuration(_))));

        let config = StoreConfig {
            secure_host: Some("not a url".to_string()),
            ..store_config()
        };
        assert!(matches!(config.validate(), Err(AssetError::Configuration(_))));
    }

    #[test]
    fn test_non_base_host_rejected() {
        let config = StoreConfig {
            host: "mailto:cdn".to_string(),
            ..store_config()
        };
        assert!(matches!(config.validate(), Err(AssetError::Configuration(_))));

        let config = StoreConfig {
            secure_host: Some("data:text/plain,cdn".to_string()),
            ..store_config()
        };
        assert!(matches!(config.validate(), Err(AssetError::Configuration(_))));
    }

    #[test]
    fn test_field_defaults() {
        let field = FieldConfig::new("photos");
        assert_eq!(field.path, "photos");
        assert_eq!(field.upload_concurrency, 4);
        assert!(!field.auto_cleanup);
        assert!(field.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let field = FieldConfig {
            upload_concurrency: 0,
            ..FieldConfig::new("photos")
        };
        assert!(matches!(field.validate(), Err(AssetError::Configuration(_))));
    }
}
