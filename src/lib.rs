/// Asset Lifecycle
///
/// Keeps image metadata records in sync with a remote object store as users
/// upload, replace, remove or delete images through form submissions.

pub mod action;
pub mod asset;
pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod plan;
pub mod remote;
pub mod upload;

pub use asset::{AssetList, AssetRecord, AssetState};
pub use config::{FieldConfig, StoreBackendConfig, StoreConfig};
pub use controller::{ListOutcome, MultiAssetController, SingleAssetController, SingleOutcome};
pub use error::{AssetError, AssetResult};
pub use form::{FileDescriptor, FormSubmission, OwnerFields};
pub use remote::RemoteStore;
