//! Domain types for swarm delegation.
//!
//! - [`task`]: `Task`, `Priority`
//! - [`agent`]: `Agent`, `BackendKind`
//! - [`handoff`]: `HandoffRequest`, `HandoffStatus`, `HandoffReceipt`
//! - [`delegation`]: `DelegationContext`, `DelegationResult`
//! - [`error`]: `SwarmError`, `ValidationError`

pub mod agent;
pub mod delegation;
pub mod error;
pub mod handoff;
pub mod task;

pub use agent::{Agent, BackendKind};
pub use delegation::{DelegationContext, DelegationMetrics, DelegationPath, DelegationResult};
pub use error::{Result, SwarmError, ValidationError};
pub use handoff::{HandoffReceipt, HandoffRequest, HandoffState, HandoffStatus};
pub use task::{Priority, Task};
