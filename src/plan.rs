/// Request plans
///
/// A plan is what a controller decides from one submission before touching the
/// remote store: the remote operations in the order they must run, and the
/// record mutation to apply once they have all succeeded.
use crate::action::RemovalMarker;
use crate::asset::{AssetRecord, AssetState};
use crate::upload::UploadIntent;

/// A remote operation of a single-asset plan
#[derive(Debug, Clone)]
pub enum RemoteOp {
    /// Delete the object currently referenced by the record
    Delete { key: String },
    /// Upload a new object
    Upload(UploadIntent),
}

/// Record change applied after every operation succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedMutation {
    Keep,
    Reset,
    /// Point the record at the object produced by the plan's upload
    ApplyUpload,
}

/// Plan for a single-asset field; operations run strictly in order
#[derive(Debug, Clone)]
pub struct RequestPlan {
    pub state: AssetState,
    pub ops: Vec<RemoteOp>,
    pub mutation: PlannedMutation,
}

impl RequestPlan {
    /// Plan that changes nothing
    pub fn unchanged(state: AssetState) -> Self {
        Self {
            state,
            ops: Vec::new(),
            mutation: PlannedMutation::Keep,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.ops.is_empty() && self.mutation == PlannedMutation::Keep
    }

    /// Keys this plan deletes, in order
    pub fn deletes(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                RemoteOp::Delete { key } => Some(key.as_str()),
                RemoteOp::Upload(_) => None,
            })
            .collect()
    }

    /// Upload of this plan, if any
    pub fn upload(&self) -> Option<&UploadIntent> {
        self.ops.iter().find_map(|op| match op {
            RemoteOp::Upload(intent) => Some(intent),
            RemoteOp::Delete { .. } => None,
        })
    }
}

/// A file of a batch, with its 1-based position among the submitted files
#[derive(Debug, Clone)]
pub struct BatchUpload {
    pub position: usize,
    pub intent: UploadIntent,
}

/// Plan for a multi-asset field; the stages run in field order
#[derive(Debug, Clone, Default)]
pub struct ListPlan {
    /// Requested display order
    pub order: Option<Vec<String>>,
    pub markers: Vec<RemovalMarker>,
    /// Descriptors of assets uploaded out of band
    pub references: Vec<AssetRecord>,
    pub uploads: Vec<BatchUpload>,
    /// Zero-byte attachments that were dropped
    pub skipped_files: usize,
}

impl ListPlan {
    pub fn is_noop(&self) -> bool {
        self.order.is_none()
            && self.markers.is_empty()
            && self.references.is_empty()
            && self.uploads.is_empty()
    }
}
