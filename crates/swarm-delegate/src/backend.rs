//! Inference backend collaborator.
//!
//! A backend executes one request and may fail or time out. Retry, backoff,
//! circuit breaking and fallback all live in [`crate::resilience`]; nothing
//! here retries.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swarm_state::MemoryRegistry;

use crate::domain::agent::BackendKind;
use crate::domain::error::Result;
use crate::domain::task::Task;

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Prompt payload: plain text or a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    Text(String),
    Messages(Vec<ChatMessage>),
}

/// Request sent to an inference backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub model: String,
    pub prompt: Prompt,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl InferenceRequest {
    /// Build the request that executes `task` on a delegated agent.
    pub fn for_task(task: &Task, model: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            model: model.into(),
            prompt: Prompt::Messages(vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: format!("You are handling a delegated {} task.", task.task_type),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: task.description.clone(),
                },
            ]),
            params,
        }
    }
}

/// Backend reply: free text or a structured result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InferenceOutput {
    Text(String),
    Structured(serde_json::Value),
}

impl InferenceOutput {
    pub fn into_json(self) -> serde_json::Value {
        match self {
            InferenceOutput::Text(text) => serde_json::Value::String(text),
            InferenceOutput::Structured(value) => value,
        }
    }
}

/// A request/response execution target.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Execute one request. Failures should be `SwarmError::Backend`.
    async fn send_request(&self, request: &InferenceRequest) -> Result<InferenceOutput>;
}

/// A backend bound to a kind, as registered for an agent.
#[derive(Clone)]
pub struct BackendEntry {
    pub kind: BackendKind,
    pub backend: Arc<dyn InferenceBackend>,
}

impl std::fmt::Debug for BackendEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendEntry")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Backends per agent, kept in registration order (first = primary).
#[derive(Debug, Default)]
pub struct BackendPool {
    entries: MemoryRegistry<Vec<BackendEntry>>,
}

impl BackendPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` for `agent_id`. A second registration of the same
    /// kind replaces the first in place.
    pub async fn register(&self, agent_id: &str, backend: Arc<dyn InferenceBackend>) {
        let entry = BackendEntry {
            kind: backend.kind(),
            backend,
        };
        self.entries
            .update_or_insert(agent_id, Vec::new, |list| {
                match list.iter_mut().find(|e| e.kind == entry.kind) {
                    Some(existing) => *existing = entry,
                    None => list.push(entry),
                }
            })
            .await;
    }

    /// Drop every backend of an agent.
    pub async fn remove_agent(&self, agent_id: &str) {
        self.entries.remove(agent_id).await;
    }

    /// Backends for `agent_id`, ordered by the agent's declared preference
    /// (`preferred`), then by registration order for the rest.
    pub async fn backends_for(&self, agent_id: &str, preferred: &[BackendKind]) -> Vec<BackendEntry> {
        let mut list = self.entries.get(agent_id).await.unwrap_or_default();
        list.sort_by_key(|e| {
            preferred
                .iter()
                .position(|k| *k == e.kind)
                .unwrap_or(preferred.len())
        });
        list
    }

    pub async fn has_backends(&self, agent_id: &str) -> bool {
        self.entries
            .get(agent_id)
            .await
            .is_some_and(|list| !list.is_empty())
    }
}
