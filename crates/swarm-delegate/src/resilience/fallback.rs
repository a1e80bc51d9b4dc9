//! Ordered fallback chain: alternate backends of the same agent first, then
//! other agents by ascending workload.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::breaker::CircuitBreakerRegistry;
use super::retry::RetryPolicy;
use crate::backend::{BackendPool, InferenceOutput, InferenceRequest};
use crate::domain::agent::{Agent, BackendKind};
use crate::domain::error::{Result, SwarmError};
use crate::metrics::Metrics;

/// One failed step of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackAttempt {
    pub agent_id: String,
    /// `None` when the agent had no backend to try.
    pub backend: Option<BackendKind>,
    pub error: String,
}

/// The step that served the request, plus every step that failed before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackOutcome {
    pub agent_id: String,
    pub backend: BackendKind,
    pub output: InferenceOutput,
    pub failed_attempts: Vec<FallbackAttempt>,
}

impl FallbackOutcome {
    /// Whether the request was served by an agent other than the primary.
    pub fn escalated(&self, primary_agent_id: &str) -> bool {
        self.agent_id != primary_agent_id
    }
}

/// Composes retry and circuit breaking over a [`BackendPool`].
pub struct FallbackChain<'a> {
    backends: &'a BackendPool,
    breakers: &'a CircuitBreakerRegistry,
    retry: RetryPolicy,
    metrics: Arc<Metrics>,
}

impl<'a> FallbackChain<'a> {
    pub fn new(
        backends: &'a BackendPool,
        breakers: &'a CircuitBreakerRegistry,
        retry: RetryPolicy,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            backends,
            breakers,
            retry,
            metrics,
        }
    }

    /// Serve `request` on `primary`, falling back to `alternates`.
    ///
    /// Each backend of `primary` is tried in its declared preference order.
    /// Only when none succeeds are the `alternates` tried, least loaded first.
    /// Callers exclude the original source agent from `alternates`.
    pub async fn execute(
        &self,
        primary: &Agent,
        alternates: &[Agent],
        request: &InferenceRequest,
    ) -> Result<FallbackOutcome> {
        let mut escalation: Vec<&Agent> = alternates
            .iter()
            .filter(|a| a.id != primary.id)
            .collect();
        escalation.sort_by(|a, b| a.workload.cmp(&b.workload).then_with(|| a.id.cmp(&b.id)));

        let mut failed_attempts = Vec::new();
        for agent in std::iter::once(primary).chain(escalation) {
            if let Some((backend, output)) = self.try_agent(agent, request, &mut failed_attempts).await {
                if agent.id != primary.id {
                    info!(
                        event = "fallback.escalated",
                        from = %primary.id,
                        to = %agent.id,
                        failed_attempts = failed_attempts.len(),
                    );
                }
                return Ok(FallbackOutcome {
                    agent_id: agent.id.clone(),
                    backend,
                    output,
                    failed_attempts,
                });
            }
        }

        let reason = if failed_attempts.is_empty() {
            "no agents to try".to_string()
        } else {
            failed_attempts
                .iter()
                .map(|a| match &a.backend {
                    Some(kind) => format!("{}/{}: {}", a.agent_id, kind, a.error),
                    None => format!("{}: {}", a.agent_id, a.error),
                })
                .collect::<Vec<_>>()
                .join("; ")
        };
        Err(SwarmError::backend("fallback-chain", reason))
    }

    async fn try_agent(
        &self,
        agent: &Agent,
        request: &InferenceRequest,
        failed_attempts: &mut Vec<FallbackAttempt>,
    ) -> Option<(BackendKind, InferenceOutput)> {
        let entries = self.backends.backends_for(&agent.id, &agent.backends).await;
        if entries.is_empty() {
            failed_attempts.push(FallbackAttempt {
                agent_id: agent.id.clone(),
                backend: None,
                error: "no backends registered".to_string(),
            });
            return None;
        }

        for entry in entries {
            let target = format!("{}/{}", agent.id, entry.kind);
            let breaker = self.breakers.for_target(&target).await;
            let breaker = breaker.as_ref();
            let backend = entry.backend.as_ref();
            let target_ref = target.as_str();
            let result = self
                .retry
                .run(target_ref, |_| breaker.call(target_ref, backend.send_request(request)))
                .await;

            match result {
                Ok(output) => return Some((entry.kind, output)),
                Err(e) => {
                    if matches!(e, SwarmError::CircuitOpen { .. }) {
                        self.metrics.inc_circuit_short_circuits();
                    }
                    warn!(event = "fallback.step_failed", target = %target, error = %e);
                    failed_attempts.push(FallbackAttempt {
                        agent_id: agent.id.clone(),
                        backend: Some(entry.kind),
                        error: e.to_string(),
                    });
                }
            }
        }
        None
    }
}
