//! In-memory `ArtifactStore` backed by a `HashMap<handoff_id, ArtifactRecord>`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::{ArtifactRecord, ArtifactStore, StorageResult};

/// In-process artifact store. Artifacts live for the process lifetime unless
/// taken or removed.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<HashMap<String, ArtifactRecord>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, record: ArtifactRecord) -> StorageResult<()> {
        let mut artifacts = self.artifacts.lock().await;
        if artifacts.contains_key(&record.handoff_id) {
            return Err(StorageError::Duplicate {
                key: record.handoff_id,
            });
        }
        debug!(
            handoff_id = %record.handoff_id,
            compressed_size = record.compressed_size(),
            "artifact stored"
        );
        artifacts.insert(record.handoff_id.clone(), record);
        Ok(())
    }

    async fn get(&self, handoff_id: &str) -> StorageResult<ArtifactRecord> {
        let artifacts = self.artifacts.lock().await;
        artifacts
            .get(handoff_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: handoff_id.to_string(),
            })
    }

    async fn take(&self, handoff_id: &str) -> StorageResult<ArtifactRecord> {
        let mut artifacts = self.artifacts.lock().await;
        artifacts
            .remove(handoff_id)
            .ok_or_else(|| StorageError::NotFound {
                key: handoff_id.to_string(),
            })
    }

    async fn restore(&self, record: ArtifactRecord) -> StorageResult<()> {
        let mut artifacts = self.artifacts.lock().await;
        artifacts.entry(record.handoff_id.clone()).or_insert(record);
        Ok(())
    }

    async fn remove(&self, handoff_id: &str) -> StorageResult<bool> {
        let mut artifacts = self.artifacts.lock().await;
        Ok(artifacts.remove(handoff_id).is_some())
    }

    async fn contains(&self, handoff_id: &str) -> StorageResult<bool> {
        let artifacts = self.artifacts.lock().await;
        Ok(artifacts.contains_key(handoff_id))
    }

    async fn len(&self) -> StorageResult<usize> {
        Ok(self.artifacts.lock().await.len())
    }
}
