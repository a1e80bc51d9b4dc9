//! Storage trait definitions for the swarm delegation engine
//!
//! - `ContentDigest`: SHA-256 digest of a canonical context string
//! - `ArtifactRecord`: a compressed handoff artifact plus its metadata
//! - `ArtifactStore`: keyed artifact storage with take-once consumption
//!
//! The trait is async and backend-agnostic. `MemoryArtifactStore` in the
//! `memory` module is the in-process implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private so the string is always lowercase hex produced
/// by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ArtifactStore
// ---------------------------------------------------------------------------

/// A compressed handoff artifact awaiting consumption by its target agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub handoff_id: String,
    pub source_agent_id: String,
    pub target_agent_id: String,
    pub task_id: String,
    /// Compression quality the payload was produced with (1-10).
    pub quality: u8,
    /// Compressed canonical context bytes.
    pub payload: Vec<u8>,
    /// Byte length of the canonical context before compression.
    pub original_size: usize,
    /// Digest of the canonical context before compression.
    pub digest: ContentDigest,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Byte length of the stored (compressed) payload.
    pub fn compressed_size(&self) -> usize {
        self.payload.len()
    }
}

/// Keyed store of handoff artifacts.
///
/// Guarantees:
/// - `put` never overwrites; a second `put` under the same id is `Duplicate`.
/// - `take` removes and returns the record atomically, so at most one caller
///   ever receives a given artifact.
/// - `remove` is idempotent and reports whether anything was removed.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store a new artifact under its `handoff_id`.
    async fn put(&self, record: ArtifactRecord) -> StorageResult<()>;

    /// Clone an artifact without consuming it. `StorageError::NotFound` if absent.
    async fn get(&self, handoff_id: &str) -> StorageResult<ArtifactRecord>;

    /// Remove and return an artifact. `StorageError::NotFound` if absent.
    async fn take(&self, handoff_id: &str) -> StorageResult<ArtifactRecord>;

    /// Put a previously taken artifact back in place.
    ///
    /// Used when consumption fails after `take`, so the artifact stays
    /// available for inspection.
    async fn restore(&self, record: ArtifactRecord) -> StorageResult<()>;

    /// Delete an artifact. Returns `true` if one was present.
    async fn remove(&self, handoff_id: &str) -> StorageResult<bool>;

    /// Check whether an artifact is stored under the id.
    async fn contains(&self, handoff_id: &str) -> StorageResult<bool>;

    /// Number of stored artifacts.
    async fn len(&self) -> StorageResult<usize>;
}
