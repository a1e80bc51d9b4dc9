//! Swarm-State: in-process state for the swarm delegation engine
//!
//! ## Layer 0 - Data
//!
//! Focus: single-map registries keyed by id, with one atomic critical section
//! per mutation, and single-use storage of compressed handoff artifacts.
//!
//! ## Key Components
//!
//! - `MemoryRegistry<V>`: id-keyed registry used for agents, handoff statuses
//!   and voting sessions
//! - `ArtifactStore`: compressed handoff artifacts with take-once semantics
//! - `ContentDigest`: SHA-256 integrity digest for stored context

mod error;
pub mod memory;
pub mod registry;
pub mod storage_traits;

pub use error::StorageError;
pub use memory::MemoryArtifactStore;
pub use registry::MemoryRegistry;
pub use storage_traits::{ArtifactRecord, ArtifactStore, ContentDigest, StorageResult};
