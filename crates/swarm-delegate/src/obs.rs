//! Structured observability hooks for delegation lifecycle events.
//!
//! - `delegation_span` scoping all logs of one delegation (attach with
//!   `tracing::Instrument`, the span must not be held across awaits)
//! - `emit_*` functions for handoff, vote and latency events
//!
//! Events are emitted at `info!` unless noted (filter via `RUST_LOG`).

use tracing::{error, info, warn};

use crate::consensus::ConsensusAlgorithm;
use crate::domain::delegation::DelegationPath;

/// Span tagged with the task id, for `future.instrument(delegation_span(id))`.
pub fn delegation_span(task_id: &str) -> tracing::Span {
    tracing::info_span!("swarm.delegation", task_id = %task_id)
}

pub fn emit_delegation_started(task_id: &str, agent_count: usize, in_flight: usize) {
    info!(
        event = "delegation.started",
        task_id = %task_id,
        agent_count = agent_count,
        in_flight = in_flight,
    );
}

pub fn emit_delegation_finished(
    task_id: &str,
    path: DelegationPath,
    agent_id: Option<&str>,
    duration_ms: u64,
    success: bool,
) {
    info!(
        event = "delegation.finished",
        task_id = %task_id,
        path = ?path,
        agent_id = agent_id.unwrap_or("-"),
        duration_ms = duration_ms,
        success = success,
    );
}

pub fn emit_handoff_initiated(handoff_id: &str, source: &str, target: &str, compressed_size: usize) {
    info!(
        event = "handoff.initiated",
        handoff_id = %handoff_id,
        source = %source,
        target = %target,
        compressed_size = compressed_size,
    );
}

pub fn emit_handoff_completed(handoff_id: &str, target: &str) {
    info!(event = "handoff.completed", handoff_id = %handoff_id, target = %target);
}

/// Handoff failure (warning level).
pub fn emit_handoff_failed(handoff_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "handoff.failed", handoff_id = %handoff_id, error = %error);
}

pub fn emit_vote_cast(session_id: &str, agent_id: &str, option_id: &str, weight: f64) {
    info!(
        event = "vote.cast",
        session_id = %session_id,
        agent_id = %agent_id,
        option_id = %option_id,
        weight = weight,
    );
}

pub fn emit_session_closed(
    session_id: &str,
    algorithm: ConsensusAlgorithm,
    consensus_reached: bool,
    confidence: f64,
) {
    info!(
        event = "session.closed",
        session_id = %session_id,
        algorithm = %algorithm,
        consensus_reached = consensus_reached,
        confidence = confidence,
    );
}

/// Soft latency breach: over target, under the hard ceiling.
pub fn emit_latency_soft_breach(latency_ms: u64, target_ms: u64) {
    warn!(event = "latency.soft_breach", latency_ms = latency_ms, target_ms = target_ms);
}

/// Hard latency breach: over the configured maximum.
pub fn emit_latency_hard_breach(latency_ms: u64, max_ms: u64) {
    error!(event = "latency.hard_breach", latency_ms = latency_ms, max_ms = max_ms);
}
