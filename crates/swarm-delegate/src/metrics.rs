//! Atomic counters for delegation observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single `tracing::info!`
//! event. Each `SwarmDelegate` owns its own `Metrics`; there is no global.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lightweight atomic counters; no allocations, no locking.
#[derive(Debug, Default)]
pub struct Metrics {
    delegations_started: AtomicU64,
    delegations_succeeded: AtomicU64,
    delegations_failed: AtomicU64,
    handoffs_completed: AtomicU64,
    votes_cast: AtomicU64,
    retries: AtomicU64,
    circuit_short_circuits: AtomicU64,
    latency_soft_breaches: AtomicU64,
    latency_hard_breaches: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub delegations_started: u64,
    pub delegations_succeeded: u64,
    pub delegations_failed: u64,
    pub handoffs_completed: u64,
    pub votes_cast: u64,
    pub retries: u64,
    pub circuit_short_circuits: u64,
    pub latency_soft_breaches: u64,
    pub latency_hard_breaches: u64,
}

macro_rules! counter {
    ($inc:ident, $field:ident) => {
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(metric = stringify!($field), "counter incremented");
        }
    };
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            delegations_started: AtomicU64::new(0),
            delegations_succeeded: AtomicU64::new(0),
            delegations_failed: AtomicU64::new(0),
            handoffs_completed: AtomicU64::new(0),
            votes_cast: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            circuit_short_circuits: AtomicU64::new(0),
            latency_soft_breaches: AtomicU64::new(0),
            latency_hard_breaches: AtomicU64::new(0),
        }
    }

    counter!(inc_delegations_started, delegations_started);
    counter!(inc_delegations_succeeded, delegations_succeeded);
    counter!(inc_delegations_failed, delegations_failed);
    counter!(inc_handoffs_completed, handoffs_completed);
    counter!(inc_votes_cast, votes_cast);
    counter!(inc_retries, retries);
    counter!(inc_circuit_short_circuits, circuit_short_circuits);
    counter!(inc_latency_soft_breaches, latency_soft_breaches);
    counter!(inc_latency_hard_breaches, latency_hard_breaches);

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            delegations_started: self.delegations_started.load(Ordering::Relaxed),
            delegations_succeeded: self.delegations_succeeded.load(Ordering::Relaxed),
            delegations_failed: self.delegations_failed.load(Ordering::Relaxed),
            handoffs_completed: self.handoffs_completed.load(Ordering::Relaxed),
            votes_cast: self.votes_cast.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            circuit_short_circuits: self.circuit_short_circuits.load(Ordering::Relaxed),
            latency_soft_breaches: self.latency_soft_breaches.load(Ordering::Relaxed),
            latency_hard_breaches: self.latency_hard_breaches.load(Ordering::Relaxed),
        }
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call at natural boundaries (end of a batch, shutdown) rather than on
    /// every increment.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            delegations_started = s.delegations_started,
            delegations_succeeded = s.delegations_succeeded,
            delegations_failed = s.delegations_failed,
            handoffs_completed = s.handoffs_completed,
            votes_cast = s.votes_cast,
            retries = s.retries,
            circuit_short_circuits = s.circuit_short_circuits,
            latency_soft_breaches = s.latency_soft_breaches,
            latency_hard_breaches = s.latency_hard_breaches,
        );
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.delegations_started,
            &self.delegations_succeeded,
            &self.delegations_failed,
            &self.handoffs_completed,
            &self.votes_cast,
            &self.retries,
            &self.circuit_short_circuits,
            &self.latency_soft_breaches,
            &self.latency_hard_breaches,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
