/// Unified error types for the asset lifecycle controllers
use crate::controller::ListOutcome;
use thiserror::Error;

/// Main error type for asset operations
#[derive(Error, Debug)]
pub enum AssetError {
    /// Missing or invalid setup, raised at construction time only
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Attached file is not an accepted image type
    #[error("Unsupported media type {mime_type} for file {filename}")]
    UnsupportedMediaType { mime_type: String, filename: String },

    /// Provider failure on upload or delete
    #[error("Remote store {operation} failed for {key}: {message}")]
    RemoteStore {
        operation: &'static str,
        key: String,
        message: String,
    },

    /// Uploaded bytes could not be probed; the remote object at `key` has no usable metadata
    #[error("Invalid image data for {key}: {message}")]
    InvalidImageData { key: String, message: String },

    /// The previous object was deleted but its replacement never landed
    #[error("Previous asset {deleted_key} was deleted but the replacement failed: {source}")]
    ReplacementLost {
        deleted_key: String,
        #[source]
        source: Box<AssetError>,
    },

    /// First failure of a batch upload, after every file settled
    ///
    /// `outcome` holds every change the submission still applied to the list.
    #[error("Upload of file #{index} ({filename}) failed, {succeeded} other file(s) were added: {source}")]
    BatchPartialFailure {
        index: usize,
        filename: String,
        succeeded: usize,
        #[source]
        source: Box<AssetError>,
        outcome: Box<ListOutcome>,
    },

    /// Malformed form payload
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssetError {
    /// Build a provider failure
    pub fn remote(operation: &'static str, key: impl Into<String>, message: impl ToString) -> Self {
        AssetError::RemoteStore {
            operation,
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for asset operations
pub type AssetResult<T> = Result<T, AssetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_failure_names_the_file() {
        let err = AssetError::BatchPartialFailure {
            index: 2,
            filename: "b.txt".to_string(),
            succeeded: 2,
            source: Box::new(AssetError::UnsupportedMediaType {
                mime_type: "text/plain".to_string(),
                filename: "b.txt".to_string(),
            }),
            outcome: Box::default(),
        };

        let message = err.to_string();
        assert!(message.contains("#2"));
        assert!(message.contains("b.txt"));
        assert!(message.contains("text/plain"));
    }

    #[test]
    fn test_replacement_lost_keeps_source() {
        let err = AssetError::ReplacementLost {
            deleted_key: "old".to_string(),
            source: Box::new(AssetError::remote("upload", "new", "quota exceeded")),
        };

        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("quota exceeded"));
    }
}
