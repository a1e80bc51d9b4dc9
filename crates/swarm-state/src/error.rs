//! Error types for swarm-state

use thiserror::Error;

/// Errors that can occur in the in-process state layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No entry stored under the key
    #[error("not found: {key}")]
    NotFound { key: String },

    /// An entry already exists under the key
    #[error("duplicate key: {key}")]
    Duplicate { key: String },

    /// Digest string is not 64 lowercase hex chars
    #[error("invalid digest: {digest}")]
    InvalidDigest { digest: String },
}
