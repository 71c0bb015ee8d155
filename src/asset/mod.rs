/// Asset records
///
/// The persisted metadata for stored images, the ordered list variant used by
/// multi-image fields, and read-only views over both.

pub mod models;
pub mod view;

pub use models::{AssetList, AssetRecord, AssetState};
