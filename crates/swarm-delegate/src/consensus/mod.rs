//! Consensus voting.
//!
//! - [`session`]: `VotingSession`, `VoteOption`, `Vote`
//! - [`algorithms`]: the four resolution algorithms and conflict detection
//! - [`engine`]: session registry with exactly-once voting and one-way close

pub mod algorithms;
pub mod engine;
pub mod session;

pub use algorithms::{
    detect_conflicts, resolve, ConsensusAlgorithm, ConsensusResult, Population, VoteConflict,
    RACE_WINDOW_MS,
};
pub use engine::ConsensusEngine;
pub use session::{SessionStatus, Vote, VoteOption, VotingSession};
