//! Handoff requests and status snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Priority;

/// Request to move a task and its context from one agent to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffRequest {
    pub source_agent_id: String,
    pub target_agent_id: String,
    pub task_id: String,
    pub context: serde_json::Value,
    #[serde(default)]
    pub priority: Priority,
}

/// Lifecycle state of a handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffState {
    Pending,
    Transferring,
    Completed,
    Failed,
}

impl HandoffState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for HandoffState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandoffState::Pending => "pending",
            HandoffState::Transferring => "transferring",
            HandoffState::Completed => "completed",
            HandoffState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Latest status snapshot of a handoff.
///
/// Progress never decreases until a terminal state is reached; `failed`
/// always resets it to 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffStatus {
    pub handoff_id: String,
    #[serde(rename = "status")]
    pub state: HandoffState,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl HandoffStatus {
    pub fn pending(handoff_id: impl Into<String>) -> Self {
        Self {
            handoff_id: handoff_id.into(),
            state: HandoffState::Pending,
            progress: 0,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Move to `state` at `progress`. Ignored (returns `false`) once terminal
    /// or when it would lower progress.
    pub fn advance(&mut self, state: HandoffState, progress: u8) -> bool {
        if self.state.is_terminal() || progress < self.progress {
            return false;
        }
        self.state = state;
        self.progress = progress.min(100);
        self.updated_at = Utc::now();
        true
    }

    /// Mark the handoff failed. Ignored once terminal.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = HandoffState::Failed;
        self.progress = 0;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
        true
    }
}

/// What `initiate_handoff` reports back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffReceipt {
    pub handoff_id: String,
    pub compressed_size: usize,
    pub original_size: usize,
    pub transfer_time_ms: u64,
}
