/// Asset metadata models
use serde::{Deserialize, Serialize};

/// Persisted metadata for one image
///
/// A record is either in the reset state (every field zero or empty) or fully
/// populated with a non-empty `public_id`. Fields are only written by the
/// controllers in this crate; everything else reads through the accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetRecord {
    pub(crate) public_id: String,
    pub(crate) version: i64,
    pub(crate) format: String,
    pub(crate) mime_type: String,
    pub(crate) original_filename: String,
    pub(crate) extension: String,
    pub(crate) hash: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) size_bytes: u64,
    pub(crate) url: String,
    pub(crate) thumbnail_url: String,
    pub(crate) secure_url: String,
    pub(crate) secure_thumbnail_url: String,
}

impl AssetRecord {
    /// An empty record (no asset)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn public_id(&self) -> &str {
        &self.public_id
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Provider content hash of the stored bytes
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn thumbnail_url(&self) -> &str {
        &self.thumbnail_url
    }

    pub fn secure_url(&self) -> &str {
        &self.secure_url
    }

    pub fn secure_thumbnail_url(&self) -> &str {
        &self.secure_thumbnail_url
    }

    /// Whether the record references a stored asset
    pub fn is_empty(&self) -> bool {
        self.public_id.is_empty()
    }

    /// Check the all-or-nothing population invariant
    pub fn is_consistent(&self) -> bool {
        if self.is_empty() {
            *self == Self::default()
        } else {
            !self.url.is_empty() && !self.thumbnail_url.is_empty()
        }
    }

    /// Return the record to the reset state
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Lifecycle state of a single asset slot within one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    /// No asset stored
    Empty,
    /// Asset stored, no pending change
    Existing,
    /// A new file is attached
    PendingUpload,
    /// Existing asset flagged to be detached; the remote object stays
    PendingRemoval,
    /// Existing asset flagged to be destroyed remotely
    PendingDeletion,
}

/// Ordered list of assets; order is display order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetList(Vec<AssetRecord>);

impl AssetList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssetRecord> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[AssetRecord] {
        &self.0
    }

    /// Public ids in list order
    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(|r| r.public_id()).collect()
    }

    /// Position of the first item with the given public id
    pub fn position(&self, public_id: &str) -> Option<usize> {
        self.0.iter().position(|r| r.public_id == public_id)
    }

    /// Stable re-sort by position in `sequence`; unlisted items go last, keeping their order
    pub(crate) fn reorder<S: AsRef<str>>(&mut self, sequence: &[S]) {
        self.0.sort_by_key(|record| {
            sequence
                .iter()
                .position(|id| id.as_ref() == record.public_id)
                .unwrap_or(usize::MAX)
        });
    }

    /// Splice out the first item with the given public id
    pub(crate) fn take(&mut self, public_id: &str) -> Option<AssetRecord> {
        let index = self.position(public_id)?;
        Some(self.0.remove(index))
    }

    pub(crate) fn push(&mut self, record: AssetRecord) {
        self.0.push(record);
    }
}

impl From<Vec<AssetRecord>> for AssetList {
    fn from(records: Vec<AssetRecord>) -> Self {
        Self(records)
    }
}

impl<'a> IntoIterator for &'a AssetList {
    type Item = &'a AssetRecord;
    type IntoIter = std::slice::Iter<'a, AssetRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
pub(crate) fn stored(public_id: &str) -> AssetRecord {
    AssetRecord {
        public_id: public_id.to_string(),
        version: 1,
        format: "png".to_string(),
        mime_type: "image/png".to_string(),
        original_filename: format!("{}.png", public_id),
        extension: "png".to_string(),
        hash: "abc".to_string(),
        width: 10,
        height: 10,
        size_bytes: 100,
        url: format!("http://cdn.example.com/{}", public_id),
        thumbnail_url: format!("http://cdn.example.com/{}?imageView/1/w/128/h/128", public_id),
        secure_url: String::new(),
        secure_thumbnail_url: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[&str]) -> AssetList {
        ids.iter().map(|id| stored(id)).collect::<Vec<_>>().into()
    }

    #[test]
    fn test_empty_record_is_consistent() {
        let record = AssetRecord::empty();
        assert!(record.is_empty());
        assert!(record.is_consistent());
        assert_eq!(record.url(), "");
        assert_eq!(record.width(), 0);
        assert_eq!(record.height(), 0);
    }

    #[test]
    fn test_partial_record_is_inconsistent() {
        let mut record = AssetRecord::empty();
        record.width = 10;
        assert!(!record.is_consistent());

        let mut record = stored("a");
        record.url.clear();
        assert!(!record.is_consistent());
    }

    #[test]
    fn test_reset_clears_every_field() {
        let mut record = stored("a");
        assert!(record.is_consistent());
        record.reset();
        assert_eq!(record, AssetRecord::empty());
    }

    #[test]
    fn test_reorder_listed_first_unlisted_after() {
        let mut assets = list(&["A", "C", "B"]);
        assets.reorder(&["B", "A"]);
        assert_eq!(assets.ids(), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_reorder_keeps_relative_order_of_unlisted() {
        let mut assets = list(&["D", "A", "C", "B"]);
        assets.reorder(&["B"]);
        assert_eq!(assets.ids(), vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn test_take_removes_first_match() {
        let mut assets = list(&["A", "B", "A"]);
        let taken = assets.take("A").unwrap();
        assert_eq!(taken.public_id(), "A");
        assert_eq!(assets.ids(), vec!["B", "A"]);
        assert!(assets.take("Z").is_none());
    }

    #[test]
    fn test_list_serializes_as_array() {
        let assets = list(&["A"]);
        let json = serde_json::to_value(&assets).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["public_id"], "A");

        let back: AssetList = serde_json::from_value(json).unwrap();
        assert_eq!(back, assets);
    }
}
