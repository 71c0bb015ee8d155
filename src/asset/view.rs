/// Read-only views over asset records and field configuration
use crate::asset::{AssetList, AssetRecord};
use crate::config::{FieldConfig, StoreConfig};

/// Whether an image is stored
pub fn exists(record: &AssetRecord) -> bool {
    !record.is_empty()
}

/// Best URL for the asset: the secure URL when requested and available
pub fn src(record: &AssetRecord, secure: bool) -> &str {
    if !exists(record) {
        return "";
    }

    if secure && !record.secure_url().is_empty() {
        record.secure_url()
    } else {
        record.url()
    }
}

/// Display value of a single-asset field
pub fn format_single(record: &AssetRecord) -> &str {
    record.url()
}

/// Display value of a multi-asset field
pub fn format_list(list: &AssetList, secure: bool) -> String {
    list.iter()
        .map(|record| src(record, secure))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Bucket the field uploads into
pub fn bucket<'a>(field: &'a FieldConfig, store: &'a StoreConfig) -> &'a str {
    field.bucket.as_deref().unwrap_or(&store.bucket)
}

/// Static public id prefix of the field, if any
pub fn prefix(field: &FieldConfig) -> Option<&str> {
    field.prefix.as_deref().filter(|p| !p.is_empty())
}
