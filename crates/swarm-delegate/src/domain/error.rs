//! Domain-level error taxonomy for the swarm delegation engine.

use swarm_state::StorageError;

/// Every rule a configuration or request violated, reported together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .violations.join("; "))]
pub struct ValidationError {
    pub violations: Vec<String>,
}

impl ValidationError {
    pub fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }

    pub fn single(violation: impl Into<String>) -> Self {
        Self {
            violations: vec![violation.into()],
        }
    }

    /// `Ok(())` when nothing was violated, otherwise the aggregated error.
    pub fn check(violations: Vec<String>) -> std::result::Result<(), Self> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Self { violations })
        }
    }
}

/// Swarm delegation errors.
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("handoff {handoff_id} is addressed to {expected}, not {actual}")]
    Unauthorized {
        handoff_id: String,
        expected: String,
        actual: String,
    },

    #[error("capacity error: {0}")]
    Capacity(String),

    #[error("consensus error: {0}")]
    Consensus(String),

    #[error("handoff declined: {0}")]
    HandoffDeclined(String),

    #[error("backend {backend} failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    ExhaustedRetries {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<SwarmError>,
    },

    #[error("circuit open for {target}, retry after {retry_after_ms}ms")]
    CircuitOpen { target: String, retry_after_ms: u64 },

    #[error("voting session {session_id} is closed")]
    SessionClosed { session_id: String },

    #[error("compression error: {0}")]
    Compression(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SwarmError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn backend(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Whether a retry against the same target may succeed. Only backend
    /// failures qualify; an open circuit goes straight to the fallback path.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}

/// Result type for swarm delegation operations.
pub type Result<T> = std::result::Result<T, SwarmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_violation() {
        let err = ValidationError::new(vec![
            "confidence_threshold must be in [0, 1]".into(),
            "max_handoff_depth must be at least 1".into(),
        ]);
        let msg = SwarmError::from(err).to_string();
        assert!(msg.contains("confidence_threshold"));
        assert!(msg.contains("max_handoff_depth"));
    }

    #[test]
    fn test_check_is_ok_without_violations() {
        assert!(ValidationError::check(vec![]).is_ok());
        assert!(ValidationError::check(vec!["x".into()]).is_err());
    }

    #[test]
    fn test_exhausted_retries_names_operation_and_cause() {
        let err = SwarmError::ExhaustedRetries {
            operation: "agent-a/local".into(),
            attempts: 3,
            source: Box::new(SwarmError::backend("local", "connection refused")),
        };
        let msg = err.to_string();
        assert!(msg.contains("agent-a/local"));
        assert!(msg.contains("connection refused"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_only_backend_failures_are_transient() {
        assert!(SwarmError::backend("remote", "timeout").is_transient());
        assert!(!SwarmError::CircuitOpen {
            target: "a".into(),
            retry_after_ms: 10
        }
        .is_transient());
        assert!(!SwarmError::Capacity("no agents".into()).is_transient());
        assert!(!SwarmError::not_found("handoff", "h-1").is_transient());
        assert!(!SwarmError::HandoffDeclined("low confidence".into()).is_transient());
    }
}
