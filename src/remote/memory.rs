/// In-memory remote store
///
/// Keeps objects in a map and records every call, so callers can inspect the
/// order in which uploads and deletes started and finished. Failures can be
/// injected per key.
use crate::error::{AssetError, AssetResult};
use crate::remote::{DeleteOutcome, RemoteStore, UploadMetadata, UploadReceipt};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// One observed step of a remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    UploadStarted(String),
    UploadFinished(String),
    DeleteStarted(String),
    DeleteFinished(String),
}

#[derive(Default)]
struct State {
    objects: HashMap<(String, String), Vec<u8>>,
    events: Vec<RemoteEvent>,
    failing_uploads: HashSet<String>,
    failing_deletes: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryRemoteStore {
    state: Mutex<State>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking holder cannot leave the maps half-written
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Place an object directly, without recording a call
    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.state()
            .objects
            .insert((bucket.to_string(), key.to_string()), data);
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.state()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn object_count(&self) -> usize {
        self.state().objects.len()
    }

    /// Make every upload to `key` fail
    pub fn fail_uploads_to(&self, key: &str) {
        self.state().failing_uploads.insert(key.to_string());
    }

    /// Make every delete of `key` fail
    pub fn fail_deletes_of(&self, key: &str) {
        self.state().failing_deletes.insert(key.to_string());
    }

    /// Every event in the order it happened
    pub fn events(&self) -> Vec<RemoteEvent> {
        self.state().events.clone()
    }

    /// Keys of started uploads, in call order
    pub fn uploads(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RemoteEvent::UploadStarted(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Keys of started deletes, in call order
    pub fn deletes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RemoteEvent::DeleteStarted(key) => Some(key),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        metadata: &UploadMetadata,
    ) -> AssetResult<UploadReceipt> {
        debug!(
            "Storing object in memory: {}/{} ({} bytes, type: {})",
            bucket,
            key,
            data.len(),
            metadata.mime_type
        );

        let failing = {
            let mut state = self.state();
            state.events.push(RemoteEvent::UploadStarted(key.to_string()));
            state.failing_uploads.contains(key)
        };

        // Let concurrent calls interleave between start and finish
        tokio::task::yield_now().await;

        let mut state = self.state();
        state.events.push(RemoteEvent::UploadFinished(key.to_string()));
        if failing {
            return Err(AssetError::remote("upload", key, "injected upload failure"));
        }

        let receipt = UploadReceipt {
            key: key.to_string(),
            size: data.len() as u64,
            hash: hex::encode(Sha256::digest(&data)),
        };
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), data);

        Ok(receipt)
    }

    async fn delete(&self, bucket: &str, key: &str) -> AssetResult<DeleteOutcome> {
        debug!("Deleting object from memory: {}/{}", bucket, key);

        let failing = {
            let mut state = self.state();
            state.events.push(RemoteEvent::DeleteStarted(key.to_string()));
            state.failing_deletes.contains(key)
        };

        tokio::task::yield_now().await;

        let mut state = self.state();
        state.events.push(RemoteEvent::DeleteFinished(key.to_string()));
        if failing {
            return Err(AssetError::remote("delete", key, "injected delete failure"));
        }

        match state.objects.remove(&(bucket.to_string(), key.to_string())) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }
}
