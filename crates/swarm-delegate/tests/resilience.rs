//! Integration tests for retry, circuit breaking and fallback through
//! `SwarmDelegate`. Time is paused so backoff and cooldown run instantly.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use swarm_delegate::{
    Agent, BackendKind, BackendPool, BreakerState, CircuitBreakerConfig, CircuitBreakerRegistry,
    DelegationContext, DelegationPath, FallbackChain, InferenceBackend, InferenceOutput,
    InferenceRequest, Metrics, Result, RetryPolicy, SwarmConfig, SwarmDelegate, SwarmError, Task,
};

/// Fails the first `failures` calls, then succeeds.
struct Flaky {
    kind: BackendKind,
    failures: u32,
    calls: AtomicU32,
}

impl Flaky {
    fn new(kind: BackendKind, failures: u32) -> Arc<Self> {
        Arc::new(Self {
            kind,
            failures,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for Flaky {
    fn kind(&self) -> BackendKind {
        self.kind.clone()
    }

    async fn send_request(&self, _request: &InferenceRequest) -> Result<InferenceOutput> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(SwarmError::backend(self.kind.to_string(), format!("timeout #{}", n + 1)))
        } else {
            Ok(InferenceOutput::Text(format!("served by {}", self.kind)))
        }
    }
}

fn task() -> Task {
    Task::new("task-r", "qa over logs", "qa")
}

async fn local_delegate(config: SwarmConfig, backend: Arc<Flaky>) -> SwarmDelegate {
    let delegate = SwarmDelegate::new(config).unwrap();
    delegate
        .register_agent(Agent::new("local", "Local").with_capabilities(["qa"]).local())
        .await
        .unwrap();
    delegate.register_backend("local", backend).await.unwrap();
    delegate
}

// ── Retry ──

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_transparently() {
    let backend = Flaky::new(BackendKind::Local, 2);
    let delegate = local_delegate(SwarmConfig::default(), backend.clone()).await;

    let result = delegate
        .delegate_task(task(), DelegationContext::default())
        .await;

    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.path, DelegationPath::Local);
    assert_eq!(backend.calls(), 3);
    assert_eq!(delegate.metrics().retries, 2);
}

#[tokio::test(start_paused = true)]
async fn exponential_backoff_doubles_between_attempts() {
    let policy = RetryPolicy::new(3, Duration::from_millis(500), true);
    let started = tokio::time::Instant::now();
    let err = policy
        .run::<(), _, _>("local/local", |_| async {
            Err(SwarmError::backend("local", "down"))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SwarmError::ExhaustedRetries { attempts: 4, .. }));
    // 500 + 1000 + 2000
    assert!(started.elapsed() >= Duration::from_millis(3_500));
    assert!(started.elapsed() < Duration::from_millis(4_000));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_in_result_not_as_panic() {
    let backend = Flaky::new(BackendKind::Local, u32::MAX);
    let mut config = SwarmConfig::default();
    config.enable_consensus = false;
    let delegate = local_delegate(config, backend.clone()).await;

    let result = delegate
        .delegate_task(task(), DelegationContext::default())
        .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.contains("local/local"), "{error}");
    assert_eq!(backend.calls(), 4);
}

// ── Fallback ──

#[tokio::test(start_paused = true)]
async fn alternate_backend_is_tried_before_another_agent() {
    let delegate = SwarmDelegate::new(SwarmConfig::default()).unwrap();
    delegate
        .register_agent(
            Agent::new("local", "Local")
                .with_capabilities(["qa"])
                .with_backend(BackendKind::Local)
                .with_backend(BackendKind::Remote)
                .local(),
        )
        .await
        .unwrap();
    delegate
        .register_agent(Agent::new("other", "Other").with_capacity(4))
        .await
        .unwrap();
    let primary = Flaky::new(BackendKind::Local, u32::MAX);
    let alternate = Flaky::new(BackendKind::Remote, 0);
    let other = Flaky::new(BackendKind::Local, 0);
    delegate.register_backend("local", primary.clone()).await.unwrap();
    delegate.register_backend("local", alternate.clone()).await.unwrap();
    delegate.register_backend("other", other.clone()).await.unwrap();

    let result = delegate
        .delegate_task(task(), DelegationContext::default())
        .await;

    assert!(result.success);
    assert_eq!(result.delegated_to_agent_id.as_deref(), Some("local"));
    assert_eq!(result.result.unwrap(), serde_json::json!("served by remote"));
    assert_eq!(alternate.calls(), 1);
    assert_eq!(other.calls(), 0);
}

// ── Circuit breaker ──

#[tokio::test(start_paused = true)]
async fn open_breaker_short_circuits_until_cooldown_elapses() {
    let config = CircuitBreakerConfig {
        failure_threshold: 2,
        cooldown_ms: 30_000,
        success_threshold: 1,
    };
    let breakers = CircuitBreakerRegistry::new(config);
    let pool = BackendPool::new();
    let backend = Flaky::new(BackendKind::Remote, 2);
    pool.register("agent", backend.clone()).await;
    let agent = Agent::new("agent", "Agent");
    let request = InferenceRequest::for_task(&task(), "m", serde_json::Value::Null);
    let metrics = Arc::new(Metrics::new());
    let chain = FallbackChain::new(
        &pool,
        &breakers,
        RetryPolicy::new(0, Duration::from_millis(1), false),
        metrics.clone(),
    );

    assert!(chain.execute(&agent, &[], &request).await.is_err());
    assert!(chain.execute(&agent, &[], &request).await.is_err());
    assert_eq!(breakers.state_of("agent/remote").await, Some(BreakerState::Open));

    // Short-circuited: the backend is not called while open.
    let err = chain.execute(&agent, &[], &request).await.unwrap_err();
    assert!(err.to_string().contains("circuit open"));
    assert_eq!(backend.calls(), 2);
    assert_eq!(metrics.snapshot().circuit_short_circuits, 1);

    tokio::time::advance(Duration::from_millis(30_000)).await;
    assert_eq!(breakers.state_of("agent/remote").await, Some(BreakerState::HalfOpen));

    let outcome = chain.execute(&agent, &[], &request).await.unwrap();
    assert_eq!(outcome.agent_id, "agent");
    assert_eq!(breakers.state_of("agent/remote").await, Some(BreakerState::Closed));
}

#[tokio::test(start_paused = true)]
async fn breaker_trips_across_delegations_then_consensus_takes_over() {
    let mut config = SwarmConfig::default();
    config.retry.max_retries = 0;
    config.circuit_breaker.failure_threshold = 1;
    let backend = Flaky::new(BackendKind::Local, u32::MAX);
    let delegate = local_delegate(config, backend.clone()).await;

    let first = delegate
        .delegate_task(task(), DelegationContext::default())
        .await;
    let second = delegate
        .delegate_task(task(), DelegationContext::default())
        .await;

    // First run: local path fails (1 call, breaker opens), consensus picks the
    // same agent and short-circuits. Second run: both paths short-circuit.
    assert!(!first.success);
    assert!(!second.success);
    assert_eq!(second.path, DelegationPath::Consensus);
    assert_eq!(backend.calls(), 1);
    assert!(delegate.metrics().circuit_short_circuits >= 3);
}
