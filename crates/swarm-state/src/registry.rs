//! Generic id-keyed registry.
//!
//! Every mutation runs inside one lock acquisition and never awaits while the
//! lock is held, so interleaved async callers observe either the state before
//! or after a mutation, never a partial update.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::storage_traits::StorageResult;

/// A single map keyed by id, owned by the service instance that created it.
#[derive(Debug)]
pub struct MemoryRegistry<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> Default for MemoryRegistry<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone + Send + Sync> MemoryRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry. `StorageError::Duplicate` if the id is taken.
    pub async fn insert(&self, id: impl Into<String>, value: V) -> StorageResult<()> {
        let id = id.into();
        let mut entries = self.entries.write().await;
        if entries.contains_key(&id) {
            return Err(StorageError::Duplicate { key: id });
        }
        entries.insert(id, value);
        Ok(())
    }

    /// Clone the entry stored under `id`.
    pub async fn get(&self, id: &str) -> Option<V> {
        self.entries.read().await.get(id).cloned()
    }

    /// Apply `f` to the entry under `id` inside a single critical section.
    ///
    /// Returns `StorageError::NotFound` if the id is unknown.
    pub async fn update<R>(&self, id: &str, f: impl FnOnce(&mut V) -> R) -> StorageResult<R> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(id).ok_or_else(|| StorageError::NotFound {
            key: id.to_string(),
        })?;
        Ok(f(entry))
    }

    /// Apply `f` to the entry under `id`, inserting `default()` first when
    /// absent. One critical section covers both steps.
    pub async fn update_or_insert<R>(
        &self,
        id: impl Into<String>,
        default: impl FnOnce() -> V,
        f: impl FnOnce(&mut V) -> R,
    ) -> R {
        let mut entries = self.entries.write().await;
        f(entries.entry(id.into()).or_insert_with(default))
    }

    /// Remove and return the entry under `id`.
    pub async fn remove(&self, id: &str) -> Option<V> {
        self.entries.write().await.remove(id)
    }

    /// Snapshot of all entries, in unspecified order.
    pub async fn values(&self) -> Vec<V> {
        self.entries.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
