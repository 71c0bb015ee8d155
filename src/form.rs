/// Form submission surface
///
/// A submission is a bag of body fields plus attached files. Each asset field
/// reads its own keys, all derived from the field path.
use crate::error::AssetResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;

/// Where the bytes of an attached file live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSource {
    /// Spooled to disk by the form parser
    Path(PathBuf),
    /// Held in memory
    Bytes(Vec<u8>),
}

/// One attached file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub source: FileSource,
    pub original_filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl FileDescriptor {
    /// Describe an in-memory file
    pub fn from_bytes(
        original_filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            size_bytes: data.len() as u64,
            source: FileSource::Bytes(data),
            original_filename: original_filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Describe a file spooled to disk
    pub fn from_path(
        path: impl Into<PathBuf>,
        original_filename: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            source: FileSource::Path(path.into()),
            original_filename: original_filename.into(),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }

    /// Load the file contents
    pub async fn read(&self) -> AssetResult<Vec<u8>> {
        match &self.source {
            FileSource::Bytes(data) => Ok(data.clone()),
            FileSource::Path(path) => Ok(fs::read(path).await?),
        }
    }

    /// Extension of the original filename, without the dot
    pub fn extension(&self) -> &str {
        match self.original_filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext,
            _ => "",
        }
    }

    /// Original filename with its last extension stripped
    pub fn stem(&self) -> &str {
        match self.original_filename.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.original_filename,
        }
    }
}

/// Files attached under one form key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttachedFiles {
    One(FileDescriptor),
    Many(Vec<FileDescriptor>),
}

impl AttachedFiles {
    pub fn as_slice(&self) -> &[FileDescriptor] {
        match self {
            AttachedFiles::One(file) => std::slice::from_ref(file),
            AttachedFiles::Many(files) => files,
        }
    }
}

/// Form keys of one field instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKeys {
    pub action: String,
    pub upload: String,
    pub uploads: String,
    pub order: String,
}

impl FieldKeys {
    pub fn new(path: &str) -> Self {
        Self {
            action: format!("{}_action", path),
            upload: format!("{}_upload", path),
            uploads: format!("{}_uploads", path),
            order: format!("{}_order", path),
        }
    }
}

/// A parsed form submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSubmission {
    pub body: HashMap<String, String>,
    pub files: HashMap<String, AttachedFiles>,
}

impl FormSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Attach files under a key
    pub fn with_files(mut self, key: impl Into<String>, files: Vec<FileDescriptor>) -> Self {
        self.files.insert(key.into(), AttachedFiles::Many(files));
        self
    }

    /// Attach a single file under a key
    pub fn with_file(mut self, key: impl Into<String>, file: FileDescriptor) -> Self {
        self.files.insert(key.into(), AttachedFiles::One(file));
        self
    }

    /// Non-empty body value
    pub fn value(&self, key: &str) -> Option<&str> {
        self.body
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Files attached under a key, in submission order
    pub fn files(&self, key: &str) -> &[FileDescriptor] {
        self.files.get(key).map(AttachedFiles::as_slice).unwrap_or(&[])
    }
}

/// Read access to the other fields of the record owning an asset field
pub trait OwnerFields {
    /// Value of `name` usable as an identifier, if present
    fn field_value(&self, name: &str) -> Option<String>;
}

impl OwnerFields for HashMap<String, String> {
    fn field_value(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl OwnerFields for Map<String, Value> {
    fn field_value(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl OwnerFields for Value {
    fn field_value(&self, name: &str) -> Option<String> {
        self.as_object()?.field_value(name)
    }
}
