//! Swarm delegate: the top-level orchestrator.
//!
//! `delegate_task` tries local delegation first (when enabled and local agents
//! exist), then consensus-mediated delegation, and always returns a
//! [`DelegationResult`] rather than an error.
//!
//! ```text
//! start ── local agents && local inference? ──► route → gate → fallback chain ──► done
//!   │                                                     │ failure
//!   ▼                                                     ▼
//!   └────────────────► consensus: vote → close → handoff → execute ──► done
//!                                                     │ failure
//!                                                     ▼
//!                                                   failed
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use swarm_state::{ArtifactStore, MemoryArtifactStore};
use tokio::sync::{broadcast, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};

use crate::backend::{BackendPool, InferenceBackend, InferenceRequest};
use crate::compression::{Compressor, DeflateCompressor};
use crate::config::{SwarmConfig, SwarmConfigPatch};
use crate::consensus::{
    ConsensusAlgorithm, ConsensusEngine, ConsensusResult, Population, VoteOption, VotingSession,
};
use crate::decision::{HandoffDecisionEngine, LatencyReport};
use crate::domain::agent::Agent;
use crate::domain::delegation::{
    DelegationContext, DelegationMetrics, DelegationPath, DelegationResult,
};
use crate::domain::error::{Result, SwarmError};
use crate::domain::handoff::{HandoffReceipt, HandoffRequest, HandoffStatus};
use crate::domain::task::Task;
use crate::events::{EventBus, SwarmEvent};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::obs;
use crate::registry::AgentRegistry;
use crate::resilience::{CircuitBreakerRegistry, FallbackChain, RetryPolicy};
use crate::router::{RouteCandidate, TaskRouter};
use crate::transfer::ContextTransfer;

/// Source id recorded on handoffs that no agent initiated.
const SWARM_SOURCE_ID: &str = "swarm";

/// Model name used when the delegation context does not name one.
const DEFAULT_MODEL: &str = "default";

/// What a successful path produced.
struct Served {
    agent_id: String,
    result: serde_json::Value,
}

/// One automatic vote cast during consensus delegation.
#[derive(Debug, Clone, PartialEq)]
struct Ballot {
    option_id: String,
    weight: f64,
    rationale: String,
}

/// A candidate whose capabilities match the task and that has headroom
/// backs itself. Every other agent backs `preferred`. The weight is the
/// number of the voter's capabilities matching the task, never below 1.
fn auto_ballot(
    router: &TaskRouter,
    task: &Task,
    voter: &Agent,
    ranked: &[RouteCandidate],
    preferred: &RouteCandidate,
) -> Ballot {
    let matched = router.matched_capabilities(task, voter).len();
    let weight = (matched as f64).max(1.0);
    let own = ranked
        .iter()
        .find(|c| c.agent.id == voter.id && matched > 0 && c.agent.headroom() > 0);
    match own {
        Some(candidate) => Ballot {
            option_id: candidate.agent.id.clone(),
            weight,
            rationale: candidate.reasoning.clone(),
        },
        None => Ballot {
            option_id: preferred.agent.id.clone(),
            weight,
            rationale: format!("defers to {}: {}", preferred.agent.id, preferred.reasoning),
        },
    }
}

/// Decrements the in-flight counter when a delegation ends.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Builder for [`SwarmDelegate`] with injectable collaborators.
pub struct SwarmDelegateBuilder {
    config: SwarmConfig,
    compressor: Arc<dyn Compressor>,
    artifacts: Arc<dyn ArtifactStore>,
    events: EventBus,
}

impl SwarmDelegateBuilder {
    pub fn compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn artifact_store(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Validate the configuration and assemble the delegate.
    pub fn build(self) -> Result<SwarmDelegate> {
        let decision = HandoffDecisionEngine::new(self.config)?;
        let config = decision.config();
        let metrics = Arc::new(Metrics::new());

        let transfer = ContextTransfer::new(self.compressor, self.artifacts)
            .with_events(self.events.clone())
            .with_metrics(Arc::clone(&metrics));
        let consensus = ConsensusEngine::new(config.max_votes_per_session)
            .with_events(self.events.clone())
            .with_metrics(Arc::clone(&metrics));
        let breakers = CircuitBreakerRegistry::new(config.circuit_breaker.clone());

        Ok(SwarmDelegate {
            decision: RwLock::new(decision),
            agents: AgentRegistry::new(),
            backends: BackendPool::new(),
            breakers,
            transfer,
            consensus,
            events: self.events,
            metrics,
            in_flight: AtomicUsize::new(0),
        })
    }
}

/// Composes routing, handoff decisions, context transfer, resilience and
/// consensus behind one `delegate_task` call.
///
/// Every registry is owned by the instance; two delegates share nothing.
pub struct SwarmDelegate {
    decision: RwLock<HandoffDecisionEngine>,
    agents: AgentRegistry,
    backends: BackendPool,
    breakers: CircuitBreakerRegistry,
    transfer: ContextTransfer,
    consensus: ConsensusEngine,
    events: EventBus,
    metrics: Arc<Metrics>,
    in_flight: AtomicUsize,
}

impl std::fmt::Debug for SwarmDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwarmDelegate")
            .field("agents", &self.agents)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl SwarmDelegate {
    /// Delegate with the default zlib compressor and in-memory artifact store.
    pub fn new(config: SwarmConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: SwarmConfig) -> SwarmDelegateBuilder {
        SwarmDelegateBuilder {
            config,
            compressor: Arc::new(DeflateCompressor::new()),
            artifacts: Arc::new(MemoryArtifactStore::new()),
            events: EventBus::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Agents and backends
    // -----------------------------------------------------------------------

    pub async fn register_agent(&self, agent: Agent) -> Result<()> {
        self.agents.register(agent).await
    }

    /// Remove an agent and its backends.
    pub async fn unregister_agent(&self, agent_id: &str) -> Option<Agent> {
        let removed = self.agents.unregister(agent_id).await;
        self.backends.remove_agent(agent_id).await;
        removed
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<Agent> {
        self.agents
            .get(agent_id)
            .await
            .ok_or_else(|| SwarmError::not_found("agent", agent_id))
    }

    pub async fn list_agents(&self) -> Vec<Agent> {
        self.agents.list().await
    }

    /// Attach an inference backend to a registered agent.
    pub async fn register_backend(
        &self,
        agent_id: &str,
        backend: Arc<dyn InferenceBackend>,
    ) -> Result<()> {
        if self.agents.get(agent_id).await.is_none() {
            return Err(SwarmError::not_found("agent", agent_id));
        }
        debug!(event = "backend.registered", agent_id = %agent_id, kind = %backend.kind());
        self.backends.register(agent_id, backend).await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Configuration and decisions
    // -----------------------------------------------------------------------

    pub async fn get_config(&self) -> SwarmConfig {
        self.decision.read().await.config().clone()
    }

    /// Apply a partial update. Nothing changes when the merged configuration
    /// is invalid; every violation is reported.
    pub async fn update_config(&self, patch: SwarmConfigPatch) -> Result<SwarmConfig> {
        let updated = self.decision.write().await.update(&patch)?.clone();
        self.breakers
            .reconfigure(updated.circuit_breaker.clone())
            .await;
        self.consensus
            .set_max_votes_per_session(updated.max_votes_per_session);
        debug!(event = "config.updated", preset = ?updated.preset);
        Ok(updated)
    }

    pub async fn should_handoff(&self, confidence: f64, current_depth: u32) -> bool {
        self.decision
            .read()
            .await
            .should_handoff(confidence, current_depth)
    }

    pub async fn check_latency_thresholds(&self, latency_ms: u64) -> LatencyReport {
        self.decision.read().await.check_latency_thresholds(latency_ms)
    }

    /// Best registered agent for `task`. `Capacity` with no agents registered.
    pub async fn route(&self, task: &Task) -> Result<RouteCandidate> {
        let strategy = self.decision.read().await.config().match_strategy;
        TaskRouter::new(strategy).route(task, &self.agents.list().await)
    }

    // -----------------------------------------------------------------------
    // Voting
    // -----------------------------------------------------------------------

    pub async fn create_voting_session(
        &self,
        topic: impl Into<String>,
        options: Vec<VoteOption>,
        quorum: Option<usize>,
    ) -> Result<String> {
        self.consensus.create_session(topic, options, quorum).await
    }

    /// Cast `agent_id`'s vote, weighted by its registered capabilities. An
    /// unregistered agent votes with weight 1.
    pub async fn cast_vote(
        &self,
        session_id: &str,
        agent_id: &str,
        option_id: &str,
        rationale: Option<String>,
    ) -> Result<bool> {
        let weight = self
            .agents
            .get(agent_id)
            .await
            .map_or(1.0, |a| a.voting_weight());
        self.consensus
            .cast_vote(session_id, agent_id, option_id, weight, rationale)
            .await
    }

    /// Close a session. `threshold` defaults to the configured
    /// `consensus_threshold`.
    pub async fn close_voting_session(
        &self,
        session_id: &str,
        algorithm: ConsensusAlgorithm,
        threshold: Option<f64>,
    ) -> Result<ConsensusResult> {
        let threshold = match threshold {
            Some(t) => t,
            None => self.decision.read().await.config().consensus_threshold,
        };
        let population = Population::from_agents(&self.agents.list().await);
        self.consensus
            .close_session(session_id, algorithm, threshold, &population)
            .await
    }

    pub async fn get_voting_session(&self, session_id: &str) -> Result<VotingSession> {
        self.consensus.get_session(session_id).await
    }

    // -----------------------------------------------------------------------
    // Handoffs
    // -----------------------------------------------------------------------

    pub async fn initiate_handoff(&self, request: HandoffRequest) -> Result<HandoffReceipt> {
        self.transfer.initiate(request).await
    }

    pub async fn complete_handoff(
        &self,
        handoff_id: &str,
        target_agent_id: &str,
    ) -> Result<serde_json::Value> {
        self.transfer.complete(handoff_id, target_agent_id).await
    }

    pub async fn cancel_handoff(&self, handoff_id: &str) -> bool {
        self.transfer.cancel(handoff_id).await
    }

    pub async fn get_handoff_status(&self, handoff_id: &str) -> Result<HandoffStatus> {
        self.transfer.status(handoff_id).await
    }

    // -----------------------------------------------------------------------
    // Observability
    // -----------------------------------------------------------------------

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Emit every counter as one log event.
    pub fn flush_metrics(&self) {
        self.metrics.flush();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwarmEvent> {
        self.events.subscribe()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Delegation
    // -----------------------------------------------------------------------

    /// Delegate `task` to the swarm. Never fails: every failure is reported
    /// in the returned result.
    pub async fn delegate_task(&self, task: Task, context: DelegationContext) -> DelegationResult {
        let span = obs::delegation_span(&task.id);
        self.run_delegation(task, context).instrument(span).await
    }

    async fn run_delegation(&self, task: Task, context: DelegationContext) -> DelegationResult {
        let started = Instant::now();
        let decision = self.decision.read().await.clone();
        let config = decision.config();

        self.metrics.inc_delegations_started();
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        if in_flight > config.max_concurrent_delegations {
            warn!(
                event = "delegation.over_capacity",
                in_flight = in_flight,
                max_concurrent = config.max_concurrent_delegations,
            );
        }

        let agents = self.agents.list().await;
        obs::emit_delegation_started(&task.id, agents.len(), in_flight);

        let (path, outcome) = if agents.is_empty() {
            (
                DelegationPath::None,
                Err(SwarmError::Capacity("no agents registered".to_string())),
            )
        } else {
            self.choose_path(&task, &context, &agents, &decision).await
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let latency = decision.check_latency_thresholds(duration_ms);
        if latency.hard_breach {
            self.metrics.inc_latency_hard_breaches();
        } else if latency.soft_breach {
            self.metrics.inc_latency_soft_breaches();
        }
        let metrics = DelegationMetrics {
            duration_ms,
            latency_within_target: latency.within_target(),
        };

        let result = match outcome {
            Ok(served) => {
                self.metrics.inc_delegations_succeeded();
                DelegationResult {
                    success: true,
                    task_id: task.id.clone(),
                    delegated_to_agent_id: Some(served.agent_id),
                    result: Some(served.result),
                    error: None,
                    path,
                    metrics,
                }
            }
            Err(e) => {
                self.metrics.inc_delegations_failed();
                DelegationResult {
                    success: false,
                    task_id: task.id.clone(),
                    delegated_to_agent_id: None,
                    result: None,
                    error: Some(e.to_string()),
                    path,
                    metrics,
                }
            }
        };

        obs::emit_delegation_finished(
            &task.id,
            result.path,
            result.delegated_to_agent_id.as_deref(),
            duration_ms,
            result.success,
        );
        self.events.publish(SwarmEvent::DelegationFinished {
            task_id: task.id,
            success: result.success,
            path: result.path,
            agent_id: result.delegated_to_agent_id.clone(),
            duration_ms,
        });
        result
    }

    /// Local first, consensus second. Returns the last path attempted.
    async fn choose_path(
        &self,
        task: &Task,
        context: &DelegationContext,
        agents: &[Agent],
        decision: &HandoffDecisionEngine,
    ) -> (DelegationPath, Result<Served>) {
        let config = decision.config();
        let router = TaskRouter::new(config.match_strategy);
        let mut last = (
            DelegationPath::None,
            Err(SwarmError::HandoffDeclined(
                "local inference and consensus are both disabled".to_string(),
            )),
        );

        if config.enable_local_inference {
            let local: Vec<Agent> = agents.iter().filter(|a| a.is_local).cloned().collect();
            if local.is_empty() {
                debug!(event = "delegation.no_local_agents");
            } else {
                match self
                    .delegate_locally(task, context, &local, agents, &router, decision)
                    .await
                {
                    Ok(served) => return (DelegationPath::Local, Ok(served)),
                    Err(e) => {
                        warn!(event = "delegation.local_failed", error = %e);
                        last = (DelegationPath::Local, Err(e));
                    }
                }
            }
        }

        if config.enable_consensus {
            if !decision.within_depth(context.depth) {
                return (
                    DelegationPath::Consensus,
                    Err(SwarmError::HandoffDeclined(format!(
                        "handoff depth {} reached the limit of {}",
                        context.depth, config.max_handoff_depth
                    ))),
                );
            }
            let outcome = self
                .delegate_by_consensus(task, context, agents, &router, config)
                .await;
            return (DelegationPath::Consensus, outcome);
        }

        last
    }

    async fn delegate_locally(
        &self,
        task: &Task,
        context: &DelegationContext,
        local: &[Agent],
        agents: &[Agent],
        router: &TaskRouter,
        decision: &HandoffDecisionEngine,
    ) -> Result<Served> {
        let candidate = router.route(task, local)?;
        if !decision.should_handoff(candidate.confidence, context.depth) {
            return Err(SwarmError::HandoffDeclined(format!(
                "local candidate {} has confidence {:.2} at depth {}",
                candidate.agent.id, candidate.confidence, context.depth
            )));
        }
        debug!(
            event = "delegation.local_candidate",
            agent_id = %candidate.agent.id,
            confidence = candidate.confidence,
            reasoning = %candidate.reasoning,
        );
        self.execute(task, context, &candidate.agent, agents, decision.config())
            .await
    }

    async fn delegate_by_consensus(
        &self,
        task: &Task,
        context: &DelegationContext,
        agents: &[Agent],
        router: &TaskRouter,
        config: &SwarmConfig,
    ) -> Result<Served> {
        let source = context.source_agent_id.as_deref();
        let mut candidates: Vec<Agent> = agents
            .iter()
            .filter(|a| Some(a.id.as_str()) != source)
            .cloned()
            .collect();
        if candidates.is_empty() {
            candidates = agents.to_vec();
        }

        let ranked = router.rank(task, &candidates);
        let preferred = ranked
            .iter()
            .find(|c| c.agent.headroom() > 0)
            .or_else(|| ranked.first())
            .ok_or_else(|| SwarmError::Capacity("no candidate agents".to_string()))?;

        let options = candidates
            .iter()
            .map(|a| {
                VoteOption::new(&a.id, &a.name).with_value(json!({
                    "capabilities": a.capabilities,
                    "workload": a.workload,
                    "capacity": a.capacity,
                }))
            })
            .collect();
        let session_id = self
            .consensus
            .create_session(format!("delegate task {}", task.id), options, None)
            .await?;
        for voter in agents {
            let ballot = auto_ballot(router, task, voter, &ranked, preferred);
            self.consensus
                .cast_vote(
                    &session_id,
                    &voter.id,
                    &ballot.option_id,
                    ballot.weight,
                    Some(ballot.rationale),
                )
                .await?;
        }

        let population = Population::from_agents(agents);
        let outcome = self
            .consensus
            .close_session(
                &session_id,
                ConsensusAlgorithm::WeightedMajority,
                config.consensus_threshold,
                &population,
            )
            .await?;
        let winner_id = match (&outcome.winning_option, outcome.consensus_reached) {
            (Some(option), true) => option.id.clone(),
            _ => {
                return Err(SwarmError::Consensus(
                    outcome
                        .reason
                        .unwrap_or_else(|| "no winning option".to_string()),
                ))
            }
        };
        let winner = candidates
            .iter()
            .find(|a| a.id == winner_id)
            .cloned()
            .ok_or_else(|| SwarmError::not_found("agent", &winner_id))?;

        let receipt = self
            .transfer
            .initiate(HandoffRequest {
                source_agent_id: source.unwrap_or(SWARM_SOURCE_ID).to_string(),
                target_agent_id: winner.id.clone(),
                task_id: task.id.clone(),
                context: json!({
                    "task": task,
                    "data": context.data,
                    "depth": context.depth + 1,
                }),
                priority: task.priority,
            })
            .await?;
        let transferred = self
            .transfer
            .complete(&receipt.handoff_id, &winner.id)
            .await?;

        if !self.backends.has_backends(&winner.id).await {
            return Ok(Served {
                agent_id: winner.id,
                result: json!({
                    "handoffId": receipt.handoff_id,
                    "context": transferred,
                }),
            });
        }
        self.execute(task, context, &winner, agents, config).await
    }

    /// Run `task` on `primary` through the fallback chain, holding one unit
    /// of its workload for the duration.
    async fn execute(
        &self,
        task: &Task,
        context: &DelegationContext,
        primary: &Agent,
        agents: &[Agent],
        config: &SwarmConfig,
    ) -> Result<Served> {
        let source = context.source_agent_id.as_deref();
        let alternates: Vec<Agent> = agents
            .iter()
            .filter(|a| a.id != primary.id && Some(a.id.as_str()) != source)
            .cloned()
            .collect();
        let request = InferenceRequest::for_task(
            task,
            context.model.as_deref().unwrap_or(DEFAULT_MODEL),
            context.params.clone(),
        );
        let retry = RetryPolicy::from_config(&config.retry).with_metrics(Arc::clone(&self.metrics));
        let chain = FallbackChain::new(&self.backends, &self.breakers, retry, Arc::clone(&self.metrics));

        self.adjust_workload(&primary.id, 1).await;
        let outcome = chain.execute(primary, &alternates, &request).await;
        self.adjust_workload(&primary.id, -1).await;

        let outcome = outcome?;
        Ok(Served {
            agent_id: outcome.agent_id,
            result: outcome.output.into_json(),
        })
    }

    async fn adjust_workload(&self, agent_id: &str, delta: i32) {
        if let Err(e) = self.agents.adjust_workload(agent_id, delta).await {
            debug!(event = "agent.workload_skipped", agent_id = %agent_id, error = %e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;

    #[tokio::test]
    async fn test_zero_agents_is_reported_not_raised() {
        let delegate = SwarmDelegate::new(SwarmConfig::default()).unwrap();
        let result = delegate
            .delegate_task(Task::new("t-1", "anything", "qa"), DelegationContext::default())
            .await;
        assert!(!result.success);
        assert_eq!(result.path, DelegationPath::None);
        assert!(!result.error.unwrap_or_default().is_empty());
        assert_eq!(delegate.in_flight(), 0);
        assert_eq!(delegate.metrics().delegations_failed, 1);
    }

    fn ranked_for(task: &Task, agents: &[Agent]) -> Vec<RouteCandidate> {
        TaskRouter::default().rank(task, agents)
    }

    #[test]
    fn test_matching_agent_backs_itself_with_match_weight() {
        let task = Task::new("t-1", "Answer questions about a document", "qa");
        let narrow = Agent::new("narrow", "Narrow").with_capabilities(["qa"]);
        let broad = Agent::new("broad", "Broad")
            .with_capabilities(["qa", "answer", "document", "ocr"])
            .with_capacity(4);
        let agents = [narrow, broad.clone()];
        let ranked = ranked_for(&task, &agents);
        assert_eq!(ranked[0].agent.id, "narrow");

        let ballot = auto_ballot(&TaskRouter::default(), &task, &broad, &ranked, &ranked[0]);
        assert_eq!(ballot.option_id, "broad");
        assert_eq!(ballot.weight, 3.0);
    }

    #[test]
    fn test_non_matching_or_saturated_agent_defers_with_floor_weight() {
        let task = Task::new("t-1", "Answer questions about a document", "qa");
        let reader = Agent::new("reader", "Reader").with_capabilities(["qa"]);
        let vision = Agent::new("vision", "Vision")
            .with_capabilities(["image-recognition", "ocr", "video", "render"]);
        let full = Agent::new("full", "Full")
            .with_capabilities(["qa", "answer"])
            .with_capacity(1)
            .with_workload(1);
        let agents = [reader, vision.clone(), full.clone()];
        let ranked = ranked_for(&task, &agents);
        let router = TaskRouter::default();

        let ballot = auto_ballot(&router, &task, &vision, &ranked, &ranked[0]);
        assert_eq!(ballot.option_id, "reader");
        assert_eq!(ballot.weight, 1.0);
        assert!(ballot.rationale.starts_with("defers to reader"));

        let ballot = auto_ballot(&router, &task, &full, &ranked, &ranked[0]);
        assert_eq!(ballot.option_id, "reader");
        assert_eq!(ballot.weight, 2.0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_at_construction() {
        let mut config = SwarmConfig::preset(Preset::Development);
        config.confidence_threshold = 0.1;
        let err = SwarmDelegate::new(config).unwrap_err();
        assert!(matches!(err, SwarmError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_backend_requires_known_agent() {
        let delegate = SwarmDelegate::new(SwarmConfig::default()).unwrap();
        struct Never;
        #[async_trait::async_trait]
        impl InferenceBackend for Never {
            fn kind(&self) -> crate::domain::agent::BackendKind {
                crate::domain::agent::BackendKind::Local
            }
            async fn send_request(
                &self,
                _request: &InferenceRequest,
            ) -> Result<crate::backend::InferenceOutput> {
                Err(SwarmError::backend("local", "never"))
            }
        }
        let err = delegate
            .register_backend("ghost", Arc::new(Never))
            .await
            .unwrap_err();
        assert!(matches!(err, SwarmError::NotFound { kind: "agent", .. }));
    }

    #[tokio::test]
    async fn test_update_config_keeps_live_config_on_error() {
        let delegate = SwarmDelegate::new(SwarmConfig::default()).unwrap();
        let err = delegate
            .update_config(SwarmConfigPatch {
                latency_target_ms: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SwarmError::Validation(_)));
        assert_eq!(delegate.get_config().await, SwarmConfig::default());
    }
}
