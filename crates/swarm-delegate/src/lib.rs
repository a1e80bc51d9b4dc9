//! Swarm Delegate Library
//!
//! Task routing, confidence-gated handoff, resilient backend execution and
//! consensus voting for a multi-agent swarm, composed behind
//! [`SwarmDelegate::delegate_task`].

pub mod backend;
pub mod compression;
pub mod config;
pub mod consensus;
pub mod decision;
pub mod delegate;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod obs;
pub mod registry;
pub mod resilience;
pub mod router;
pub mod telemetry;
pub mod transfer;

pub use domain::{
    Agent, BackendKind, DelegationContext, DelegationMetrics, DelegationPath, DelegationResult,
    HandoffReceipt, HandoffRequest, HandoffState, HandoffStatus, Priority, Result, SwarmError,
    Task, ValidationError,
};

pub use backend::{
    BackendPool, ChatMessage, InferenceBackend, InferenceOutput, InferenceRequest, Prompt,
};
pub use compression::{CompressionOptions, Compressor, DeflateCompressor};
pub use config::{
    CircuitBreakerConfig, CircuitBreakerPatch, LogLevel, MatchStrategy, Preset,
    RetryPolicyConfig, RetryPolicyPatch, SwarmConfig, SwarmConfigPatch,
};
pub use consensus::{
    ConsensusAlgorithm, ConsensusEngine, ConsensusResult, Population, SessionStatus, Vote,
    VoteConflict, VoteOption, VotingSession,
};
pub use decision::{HandoffDecisionEngine, LatencyReport};
pub use delegate::{SwarmDelegate, SwarmDelegateBuilder};
pub use events::{EventBus, SwarmEvent};
pub use metrics::{Metrics, MetricsSnapshot};
pub use registry::AgentRegistry;
pub use resilience::{
    BreakerState, CircuitBreaker, CircuitBreakerRegistry, FallbackAttempt, FallbackChain,
    FallbackOutcome, RetryPolicy,
};
pub use router::{RouteCandidate, TaskRouter};
pub use telemetry::{init_tracing, init_tracing_from_config, LogFormat};
pub use transfer::ContextTransfer;

pub use swarm_state::{ArtifactRecord, ArtifactStore, ContentDigest, MemoryArtifactStore};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
