//! Agent registry owned by one `SwarmDelegate`.

use swarm_state::{MemoryRegistry, StorageError};
use tracing::{debug, info};

use crate::domain::agent::Agent;
use crate::domain::error::{Result, SwarmError, ValidationError};

/// Id-keyed set of registered agents.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: MemoryRegistry<Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new agent.
    ///
    /// Rejects an empty id or a zero capacity with a `ValidationError`, and a
    /// duplicate id with `StorageError::Duplicate`.
    pub async fn register(&self, agent: Agent) -> Result<()> {
        let mut violations = Vec::new();
        if agent.id.trim().is_empty() {
            violations.push("agent id must not be empty".to_string());
        }
        if agent.capacity == 0 {
            violations.push(format!("agent {} capacity must be at least 1", agent.id));
        }
        ValidationError::check(violations)?;

        let id = agent.id.clone();
        let capabilities = agent.capabilities.len();
        let is_local = agent.is_local;
        self.agents.insert(id.clone(), agent).await?;
        info!(
            event = "agent.registered",
            agent_id = %id,
            capabilities = capabilities,
            is_local = is_local,
        );
        Ok(())
    }

    /// Remove an agent. Returns the removed agent, if any.
    pub async fn unregister(&self, agent_id: &str) -> Option<Agent> {
        let removed = self.agents.remove(agent_id).await;
        if removed.is_some() {
            info!(event = "agent.unregistered", agent_id = %agent_id);
        }
        removed
    }

    pub async fn get(&self, agent_id: &str) -> Option<Agent> {
        self.agents.get(agent_id).await
    }

    /// Snapshot of every agent, sorted by id for stable iteration.
    pub async fn list(&self) -> Vec<Agent> {
        let mut agents = self.agents.values().await;
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    /// Registered agents with `is_local` set.
    pub async fn local_agents(&self) -> Vec<Agent> {
        self.list().await.into_iter().filter(|a| a.is_local).collect()
    }

    pub async fn len(&self) -> usize {
        self.agents.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.is_empty().await
    }

    /// Add `delta` to an agent's workload, saturating at zero. Returns the new
    /// workload.
    pub async fn adjust_workload(&self, agent_id: &str, delta: i32) -> Result<u32> {
        let workload = self
            .agents
            .update(agent_id, |agent| {
                agent.workload = agent.workload.saturating_add_signed(delta);
                agent.workload
            })
            .await
            .map_err(|e| match e {
                StorageError::NotFound { key } => SwarmError::not_found("agent", key),
                other => other.into(),
            })?;
        debug!(event = "agent.workload", agent_id = %agent_id, workload = workload);
        Ok(workload)
    }

    /// Sum of voting weights across every registered agent.
    pub async fn total_voting_weight(&self) -> f64 {
        self.agents
            .values()
            .await
            .iter()
            .map(Agent::voting_weight)
            .sum()
    }
}
