//! Per-target circuit breaker with cooldown and half-open probing.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use swarm_state::MemoryRegistry;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::CircuitBreakerConfig;
use crate::domain::error::{Result, SwarmError};

const CLOSED: u8 = 0;
const OPEN: u8 = 1;
const HALF_OPEN: u8 = 2;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Atomic circuit breaker for one target.
///
/// Opens after `failure_threshold` consecutive failures. While open, calls
/// short-circuit with `SwarmError::CircuitOpen` without being issued. Once
/// `cooldown` elapses the next call is let through as a half-open probe;
/// `success_threshold` probe successes close it, any probe failure re-opens it.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    probe_successes: AtomicU32,
    /// Milliseconds since `epoch` when the breaker last opened.
    opened_at_ms: AtomicU64,
    epoch: Instant,
    failure_threshold: u32,
    success_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            state: AtomicU8::new(CLOSED),
            consecutive_failures: AtomicU32::new(0),
            probe_successes: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
            epoch: Instant::now(),
            failure_threshold: config.failure_threshold.max(1),
            success_threshold: config.success_threshold.max(1),
            cooldown: Duration::from_millis(config.cooldown_ms),
        }
    }

    /// Current state. An open breaker whose cooldown has elapsed reports
    /// `HalfOpen`.
    pub fn state(&self) -> BreakerState {
        match self.state.load(Ordering::SeqCst) {
            OPEN if self.remaining_cooldown().is_zero() => BreakerState::HalfOpen,
            OPEN => BreakerState::Open,
            HALF_OPEN => BreakerState::HalfOpen,
            _ => BreakerState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == BreakerState::Open
    }

    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Admit a call, or report how long the breaker stays open.
    pub fn try_acquire(&self) -> std::result::Result<(), Duration> {
        if self.state.load(Ordering::SeqCst) != OPEN {
            return Ok(());
        }
        let remaining = self.remaining_cooldown();
        if !remaining.is_zero() {
            return Err(remaining);
        }
        if self
            .state
            .compare_exchange(OPEN, HALF_OPEN, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.probe_successes.store(0, Ordering::SeqCst);
        }
        Ok(())
    }

    pub fn record_success(&self) {
        match self.state.load(Ordering::SeqCst) {
            HALF_OPEN => {
                let successes = self.probe_successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.success_threshold {
                    self.state.store(CLOSED, Ordering::SeqCst);
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                }
            }
            _ => self.consecutive_failures.store(0, Ordering::SeqCst),
        }
    }

    /// Record a failure. Returns `true` when this failure opened the breaker.
    pub fn record_failure(&self) -> bool {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        let state = self.state.load(Ordering::SeqCst);
        let should_open = state == HALF_OPEN || (state == CLOSED && failures >= self.failure_threshold);
        if should_open {
            self.opened_at_ms
                .store(self.epoch.elapsed().as_millis() as u64, Ordering::SeqCst);
            self.state.store(OPEN, Ordering::SeqCst);
        }
        should_open
    }

    /// Run `call` through the breaker for `target`.
    ///
    /// Only transient failures count against the target.
    pub async fn call<T, Fut>(&self, target: &str, call: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        if let Err(remaining) = self.try_acquire() {
            return Err(SwarmError::CircuitOpen {
                target: target.to_string(),
                retry_after_ms: remaining.as_millis() as u64,
            });
        }
        match call.await {
            Ok(value) => {
                if self.state.load(Ordering::SeqCst) == HALF_OPEN {
                    info!(event = "breaker.probe_succeeded", target = %target);
                }
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                if e.is_transient() && self.record_failure() {
                    warn!(
                        event = "breaker.opened",
                        target = %target,
                        consecutive_failures = self.failure_count(),
                        cooldown_ms = self.cooldown.as_millis() as u64,
                    );
                }
                Err(e)
            }
        }
    }

    fn remaining_cooldown(&self) -> Duration {
        let opened_at = Duration::from_millis(self.opened_at_ms.load(Ordering::SeqCst));
        (opened_at + self.cooldown).saturating_sub(self.epoch.elapsed())
    }
}

/// One breaker per target key (`"{agent_id}/{backend}"`), created lazily.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    config: RwLock<CircuitBreakerConfig>,
    breakers: MemoryRegistry<Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: RwLock::new(config),
            breakers: MemoryRegistry::new(),
        }
    }

    /// Breaker for `target`, creating a closed one on first use.
    pub async fn for_target(&self, target: &str) -> Arc<CircuitBreaker> {
        let config = self.config.read().await.clone();
        self.breakers
            .update_or_insert(
                target,
                || Arc::new(CircuitBreaker::new(&config)),
                |breaker| Arc::clone(breaker),
            )
            .await
    }

    /// State of an existing breaker; `None` if `target` was never called.
    pub async fn state_of(&self, target: &str) -> Option<BreakerState> {
        self.breakers.get(target).await.map(|b| b.state())
    }

    /// New parameters apply to breakers created from now on; existing
    /// breakers keep their state and parameters.
    pub async fn reconfigure(&self, config: CircuitBreakerConfig) {
        *self.config.write().await = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            cooldown_ms: 1_000,
            success_threshold: 2,
        }
    }

    #[test]
    fn test_circuit_breaker_starts_closed() {
        let cb = CircuitBreaker::new(&config());
        assert_eq!(cb.state(), BreakerState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_breaker_opens_at_threshold() {
        let cb = CircuitBreaker::new(&config());
        assert!(!cb.record_failure());
        assert!(!cb.record_failure());
        assert!(!cb.is_open());
        assert!(cb.record_failure());
        assert!(cb.is_open());
        assert!(cb.try_acquire().is_err());
    }

    #[test]
    fn test_circuit_breaker_resets_on_success() {
        let cb = CircuitBreaker::new(&config());
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.failure_count(), 0);
        assert!(!cb.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_after_cooldown_then_closes() {
        let cb = CircuitBreaker::new(&config());
        for _ in 0..3 {
            cb.record_failure();
        }
        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(cb.state(), BreakerState::Open);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cb.state(), BreakerState::HalfOpen);
        assert!(cb.try_acquire().is_ok());

        cb.record_success();
        assert_eq!(cb.state(), BreakerState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_reopens() {
        let cb = CircuitBreaker::new(&config());
        for _ in 0..3 {
            cb.record_failure();
        }
        tokio::time::advance(Duration::from_millis(1_000)).await;
        assert!(cb.try_acquire().is_ok());
        assert!(cb.record_failure());
        assert_eq!(cb.state(), BreakerState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_breaker_does_not_issue_call() {
        let cb = CircuitBreaker::new(&config());
        for _ in 0..3 {
            cb.record_failure();
        }
        let mut issued = false;
        let err = cb
            .call("a/local", async {
                issued = true;
                Ok::<_, SwarmError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SwarmError::CircuitOpen { retry_after_ms: 1_000, .. }));
        assert!(!issued);
    }

    #[tokio::test]
    async fn test_non_transient_errors_do_not_trip() {
        let cb = CircuitBreaker::new(&config());
        for _ in 0..5 {
            let _ = cb
                .call("a/local", async { Err::<(), _>(SwarmError::Capacity("x".into())) })
                .await;
        }
        assert_eq!(cb.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_registry_shares_breaker_per_target() {
        let registry = CircuitBreakerRegistry::new(config());
        let a = registry.for_target("a/local").await;
        a.record_failure();
        assert_eq!(registry.for_target("a/local").await.failure_count(), 1);
        assert_eq!(registry.for_target("b/local").await.failure_count(), 0);
        assert_eq!(registry.state_of("c/local").await, None);
    }
}
