//! Voting session registry.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use swarm_state::{MemoryRegistry, StorageError};
use tracing::{debug, warn};

use super::algorithms::{resolve, ConsensusAlgorithm, ConsensusResult, Population};
use super::session::{SessionStatus, Vote, VoteOption, VotingSession};
use crate::domain::error::{Result, SwarmError, ValidationError};
use crate::events::{EventBus, SwarmEvent};
use crate::metrics::Metrics;
use crate::obs;

/// Owns every voting session of one delegate instance. Closed sessions are
/// kept for audit.
#[derive(Debug)]
pub struct ConsensusEngine {
    sessions: MemoryRegistry<VotingSession>,
    max_votes_per_session: AtomicUsize,
    events: EventBus,
    metrics: Arc<Metrics>,
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl ConsensusEngine {
    pub fn new(max_votes_per_session: usize) -> Self {
        Self {
            sessions: MemoryRegistry::new(),
            max_votes_per_session: AtomicUsize::new(max_votes_per_session),
            events: EventBus::default(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn set_max_votes_per_session(&self, max: usize) {
        self.max_votes_per_session.store(max, Ordering::Relaxed);
    }

    /// Open a session over `options` and return its id.
    ///
    /// Rejects an empty option set, duplicate option ids and a zero quorum.
    pub async fn create_session(
        &self,
        topic: impl Into<String>,
        options: Vec<VoteOption>,
        quorum: Option<usize>,
    ) -> Result<String> {
        let mut violations = Vec::new();
        if options.is_empty() {
            violations.push("a voting session needs at least one option".to_string());
        }
        let mut seen = BTreeSet::new();
        for option in &options {
            if !seen.insert(option.id.as_str()) {
                violations.push(format!("duplicate option id: {}", option.id));
            }
        }
        if quorum == Some(0) {
            violations.push("quorum must be at least 1".to_string());
        }
        ValidationError::check(violations)?;

        let id = format!("session-{}", uuid::Uuid::new_v4());
        let session = VotingSession::new(&id, topic, options, quorum);
        debug!(
            event = "session.created",
            session_id = %id,
            options = session.options.len(),
            quorum = ?quorum,
        );
        self.sessions.insert(id.clone(), session).await?;
        Ok(id)
    }

    /// Record one vote. Returns `false` (and records nothing) for a closed
    /// session, an unknown option, or an agent that already voted.
    ///
    /// `NotFound` for an unknown session; `Capacity` once the session holds
    /// `max_votes_per_session` votes.
    pub async fn cast_vote(
        &self,
        session_id: &str,
        agent_id: &str,
        option_id: &str,
        weight: f64,
        rationale: Option<String>,
    ) -> Result<bool> {
        let max_votes = self.max_votes_per_session.load(Ordering::Relaxed);
        let weight = weight.max(1.0);
        let accepted = self
            .sessions
            .update(session_id, |session| {
                if !session.is_open() {
                    return Ok(Err("session closed"));
                }
                if session.option(option_id).is_none() {
                    return Ok(Err("unknown option"));
                }
                if session.has_voted(agent_id) {
                    return Ok(Err("agent already voted"));
                }
                if session.votes.len() >= max_votes {
                    return Err(SwarmError::Capacity(format!(
                        "session {session_id} already holds {max_votes} votes"
                    )));
                }
                session.votes.push(Vote {
                    agent_id: agent_id.to_string(),
                    option_id: option_id.to_string(),
                    weight,
                    timestamp: Utc::now(),
                    rationale,
                });
                Ok(Ok(()))
            })
            .await
            .map_err(|e| session_error(e, session_id))??;

        match accepted {
            Ok(()) => {
                self.metrics.inc_votes_cast();
                obs::emit_vote_cast(session_id, agent_id, option_id, weight);
                self.events.publish(SwarmEvent::VoteCast {
                    session_id: session_id.to_string(),
                    agent_id: agent_id.to_string(),
                    option_id: option_id.to_string(),
                    weight,
                });
                Ok(true)
            }
            Err(reason) => {
                debug!(
                    event = "vote.rejected",
                    session_id = %session_id,
                    agent_id = %agent_id,
                    option_id = %option_id,
                    reason = reason,
                );
                Ok(false)
            }
        }
    }

    /// Close an open session and resolve it.
    ///
    /// `threshold` must be in (0, 1]. A second close fails with
    /// `SessionClosed`; the stored result is left untouched.
    pub async fn close_session(
        &self,
        session_id: &str,
        algorithm: ConsensusAlgorithm,
        threshold: f64,
        population: &Population,
    ) -> Result<ConsensusResult> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ValidationError::single(format!(
                "consensus threshold must be in (0, 1] (got {threshold})"
            ))
            .into());
        }

        let result = self
            .sessions
            .update(session_id, |session| {
                if !session.is_open() {
                    return Err(SwarmError::SessionClosed {
                        session_id: session_id.to_string(),
                    });
                }
                let result = resolve(session, algorithm, threshold, population);
                session.status = SessionStatus::Closed;
                session.closed_at = Some(Utc::now());
                session.result = Some(result.clone());
                Ok(result)
            })
            .await
            .map_err(|e| session_error(e, session_id))??;

        if !result.conflicts.is_empty() {
            warn!(
                event = "session.conflicts",
                session_id = %session_id,
                conflicts = result.conflicts.len(),
            );
        }
        obs::emit_session_closed(
            session_id,
            algorithm,
            result.consensus_reached,
            result.confidence,
        );
        self.events.publish(SwarmEvent::SessionClosed {
            session_id: session_id.to_string(),
            algorithm,
            consensus_reached: result.consensus_reached,
            winning_option_id: result.winning_option.as_ref().map(|o| o.id.clone()),
        });
        Ok(result)
    }

    /// Snapshot of a session, open or closed.
    pub async fn get_session(&self, session_id: &str) -> Result<VotingSession> {
        self.sessions
            .get(session_id)
            .await
            .ok_or_else(|| SwarmError::not_found("voting session", session_id))
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }
}

fn session_error(error: StorageError, session_id: &str) -> SwarmError {
    match error {
        StorageError::NotFound { .. } => SwarmError::not_found("voting session", session_id),
        other => other.into(),
    }
}
