//! Inputs and outcomes of `SwarmDelegate::delegate_task`.

use serde::{Deserialize, Serialize};

/// Caller-supplied context for one delegation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelegationContext {
    /// Agent currently holding the task. Excluded from escalation targets.
    #[serde(default)]
    pub source_agent_id: Option<String>,
    /// Number of handoffs already taken by this task.
    #[serde(default)]
    pub depth: u32,
    /// Model name passed to the inference backend.
    #[serde(default)]
    pub model: Option<String>,
    /// Free-form inference parameters.
    #[serde(default)]
    pub params: serde_json::Value,
    /// Additional context transferred alongside the task.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Which branch of the delegation state machine produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationPath {
    Local,
    Consensus,
    /// No path could be attempted (e.g. zero registered agents).
    None,
}

/// Timing recorded for every delegation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationMetrics {
    pub duration_ms: u64,
    pub latency_within_target: bool,
}

/// Result object returned by `delegate_task`. Failures are reported here
/// rather than raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationResult {
    pub success: bool,
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegated_to_agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub path: DelegationPath,
    pub metrics: DelegationMetrics,
}
