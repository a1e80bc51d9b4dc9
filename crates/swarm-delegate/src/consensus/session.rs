//! Voting session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::algorithms::ConsensusResult;

/// A choice offered in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl VoteOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value: serde_json::Value::Null,
        }
    }

    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = value;
        self
    }
}

/// One recorded vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub agent_id: String,
    pub option_id: String,
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// A vote over a fixed option set. Transitions open → closed exactly once and
/// is retained after closing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingSession {
    pub id: String,
    pub topic: String,
    pub options: Vec<VoteOption>,
    pub votes: Vec<Vote>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quorum: Option<usize>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Set when the session closes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ConsensusResult>,
}

impl VotingSession {
    pub fn new(
        id: impl Into<String>,
        topic: impl Into<String>,
        options: Vec<VoteOption>,
        quorum: Option<usize>,
    ) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            options,
            votes: Vec::new(),
            status: SessionStatus::Open,
            quorum,
            created_at: Utc::now(),
            closed_at: None,
            result: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    pub fn option(&self, option_id: &str) -> Option<&VoteOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn has_voted(&self, agent_id: &str) -> bool {
        self.votes.iter().any(|v| v.agent_id == agent_id)
    }

    pub fn quorum_met(&self) -> bool {
        self.quorum.map_or(true, |q| self.votes.len() >= q)
    }
}
