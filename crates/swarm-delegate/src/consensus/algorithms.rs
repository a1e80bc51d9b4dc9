//! Resolution algorithms and post-close conflict detection.
//!
//! | Algorithm            | Tally   | Reached when                                        |
//! |----------------------|---------|-----------------------------------------------------|
//! | simple majority      | count   | winner > 1/2 of votes cast                          |
//! | weighted majority    | weight  | winner > 1/2 of weight cast                         |
//! | supermajority        | weight  | winner >= threshold x weight cast                   |
//! | consensus threshold  | weight  | every registered agent voted the same option and    |
//! |                      |         | winner >= threshold x registered population weight |
//!
//! A configured quorum is checked before any algorithm runs.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::session::{Vote, VoteOption, VotingSession};
use crate::domain::agent::Agent;
use crate::domain::error::ValidationError;

/// Votes from different agents closer together than this are flagged.
pub const RACE_WINDOW_MS: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsensusAlgorithm {
    SimpleMajority,
    WeightedMajority,
    Supermajority,
    ConsensusThreshold,
}

impl std::fmt::Display for ConsensusAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConsensusAlgorithm::SimpleMajority => "simple-majority",
            ConsensusAlgorithm::WeightedMajority => "weighted-majority",
            ConsensusAlgorithm::Supermajority => "supermajority",
            ConsensusAlgorithm::ConsensusThreshold => "consensus-threshold",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ConsensusAlgorithm {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "simple-majority" => Ok(Self::SimpleMajority),
            "weighted-majority" => Ok(Self::WeightedMajority),
            "supermajority" => Ok(Self::Supermajority),
            "consensus-threshold" => Ok(Self::ConsensusThreshold),
            other => Err(ValidationError::single(format!(
                "unknown consensus algorithm: {other}"
            ))),
        }
    }
}

/// Voting weights of every registered agent, the denominator for
/// [`ConsensusAlgorithm::ConsensusThreshold`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Population {
    weights: BTreeMap<String, f64>,
}

impl Population {
    pub fn from_agents<'a>(agents: impl IntoIterator<Item = &'a Agent>) -> Self {
        Self {
            weights: agents
                .into_iter()
                .map(|a| (a.id.clone(), a.voting_weight()))
                .collect(),
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.weights.contains_key(agent_id)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// A suspicious pattern found after a session closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoteConflict {
    /// One agent recorded more than one vote.
    DuplicateVote { agent_id: String, count: usize },
    /// Two agents voted within [`RACE_WINDOW_MS`] of each other.
    PossibleRace {
        first_agent_id: String,
        second_agent_id: String,
        gap_ms: i64,
    },
}

/// Outcome of closing a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Leading option; `None` only when no vote was cast.
    pub winning_option: Option<VoteOption>,
    /// Winner's share of the algorithm's denominator, in [0, 1].
    pub confidence: f64,
    /// Tally per option id (counts for simple majority, weights otherwise).
    pub vote_distribution: BTreeMap<String, f64>,
    pub consensus_reached: bool,
    pub resolution_method: ConsensusAlgorithm,
    pub total_votes: usize,
    /// Why consensus was not reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub conflicts: Vec<VoteConflict>,
}

/// Resolve `session` with `algorithm`. `threshold` applies to supermajority
/// and consensus threshold; `population` only to consensus threshold.
pub fn resolve(
    session: &VotingSession,
    algorithm: ConsensusAlgorithm,
    threshold: f64,
    population: &Population,
) -> ConsensusResult {
    let weighted = algorithm != ConsensusAlgorithm::SimpleMajority;
    let vote_distribution = tally(&session.options, &session.votes, weighted);
    let total_cast: f64 = vote_distribution.values().sum();

    // First option wins ties, so option order is the tie-break.
    let leader = session
        .options
        .iter()
        .map(|o| (o, vote_distribution.get(&o.id).copied().unwrap_or(0.0)))
        .fold(None::<(&VoteOption, f64)>, |best, (o, t)| match best {
            Some((_, bt)) if bt >= t => best,
            _ => Some((o, t)),
        })
        .filter(|(_, t)| *t > 0.0);

    let conflicts = detect_conflicts(&session.votes);
    let mut result = ConsensusResult {
        winning_option: leader.map(|(o, _)| o.clone()),
        confidence: 0.0,
        vote_distribution,
        consensus_reached: false,
        resolution_method: algorithm,
        total_votes: session.votes.len(),
        reason: None,
        conflicts,
    };

    if !session.quorum_met() {
        result.reason = Some(format!(
            "quorum not met: {} of {} votes",
            session.votes.len(),
            session.quorum.unwrap_or_default()
        ));
        return result;
    }
    let Some((winner, winning)) = leader else {
        result.reason = Some("no votes cast".to_string());
        return result;
    };

    let (denominator, reached, failure) = match algorithm {
        ConsensusAlgorithm::SimpleMajority | ConsensusAlgorithm::WeightedMajority => (
            total_cast,
            winning > total_cast / 2.0,
            "no option holds a strict majority",
        ),
        ConsensusAlgorithm::Supermajority => (
            total_cast,
            winning >= threshold * total_cast,
            "winning share is below the supermajority threshold",
        ),
        ConsensusAlgorithm::ConsensusThreshold => {
            let population_weight = population.total_weight();
            let unanimous = !population.is_empty()
                && population.weights.keys().all(|agent_id| {
                    session
                        .votes
                        .iter()
                        .any(|v| &v.agent_id == agent_id && v.option_id == winner.id)
                });
            (
                population_weight,
                unanimous && winning >= threshold * population_weight,
                "not every registered agent voted for the same option",
            )
        }
    };

    if denominator > 0.0 {
        result.confidence = (winning / denominator).min(1.0);
    }
    result.consensus_reached = reached;
    if !reached {
        result.reason = Some(failure.to_string());
    }
    result
}

/// Tally votes per option, seeding every option with zero.
fn tally(options: &[VoteOption], votes: &[Vote], weighted: bool) -> BTreeMap<String, f64> {
    let mut distribution: BTreeMap<String, f64> =
        options.iter().map(|o| (o.id.clone(), 0.0)).collect();
    for vote in votes {
        if let Some(total) = distribution.get_mut(&vote.option_id) {
            *total += if weighted { vote.weight } else { 1.0 };
        }
    }
    distribution
}

/// Flag duplicate voters and near-simultaneous votes from different agents.
pub fn detect_conflicts(votes: &[Vote]) -> Vec<VoteConflict> {
    let mut conflicts = Vec::new();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for vote in votes {
        *counts.entry(vote.agent_id.as_str()).or_default() += 1;
    }
    conflicts.extend(
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(agent_id, count)| VoteConflict::DuplicateVote {
                agent_id: agent_id.to_string(),
                count,
            }),
    );

    let mut ordered: Vec<&Vote> = votes.iter().collect();
    ordered.sort_by_key(|v| v.timestamp);
    let mut seen = BTreeSet::new();
    for (i, first) in ordered.iter().enumerate() {
        for second in &ordered[i + 1..] {
            let gap_ms = (second.timestamp - first.timestamp).num_milliseconds();
            if gap_ms >= RACE_WINDOW_MS {
                break;
            }
            if first.agent_id != second.agent_id
                && seen.insert((first.agent_id.clone(), second.agent_id.clone()))
            {
                conflicts.push(VoteConflict::PossibleRace {
                    first_agent_id: first.agent_id.clone(),
                    second_agent_id: second.agent_id.clone(),
                    gap_ms,
                });
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn session_with(votes: &[(&str, &str, f64)], quorum: Option<usize>) -> VotingSession {
        let mut session = VotingSession::new(
            "s-1",
            "pick",
            vec![VoteOption::new("x", "X"), VoteOption::new("y", "Y")],
            quorum,
        );
        let start = Utc::now();
        for (i, (agent, option, weight)) in votes.iter().enumerate() {
            session.votes.push(Vote {
                agent_id: agent.to_string(),
                option_id: option.to_string(),
                weight: *weight,
                timestamp: start + Duration::milliseconds(i as i64 * 500),
                rationale: None,
            });
        }
        session
    }

    fn three_two() -> VotingSession {
        session_with(
            &[
                ("a", "x", 1.0),
                ("b", "x", 1.0),
                ("c", "x", 1.0),
                ("d", "y", 1.0),
                ("e", "y", 1.0),
            ],
            None,
        )
    }

    #[test]
    fn test_supermajority_threshold_decides_three_two_split() {
        let session = three_two();
        let strict = resolve(&session, ConsensusAlgorithm::Supermajority, 0.8, &Population::default());
        assert!(!strict.consensus_reached);
        assert!((strict.confidence - 0.6).abs() < 1e-9);

        let loose = resolve(&session, ConsensusAlgorithm::Supermajority, 0.5, &Population::default());
        assert!(loose.consensus_reached);
        assert_eq!(loose.winning_option.unwrap().id, "x");
    }

    #[test]
    fn test_simple_majority_ignores_weights() {
        let session = session_with(&[("a", "x", 1.0), ("b", "y", 1.0), ("c", "y", 5.0)], None);
        let simple = resolve(&session, ConsensusAlgorithm::SimpleMajority, 0.67, &Population::default());
        assert_eq!(simple.vote_distribution["y"], 2.0);
        assert!(simple.consensus_reached);

        let weighted = resolve(&session, ConsensusAlgorithm::WeightedMajority, 0.67, &Population::default());
        assert_eq!(weighted.vote_distribution["y"], 6.0);
        assert!((weighted.confidence - 6.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_even_split_has_no_strict_majority() {
        let session = session_with(&[("a", "x", 1.0), ("b", "y", 1.0)], None);
        let result = resolve(&session, ConsensusAlgorithm::WeightedMajority, 0.67, &Population::default());
        assert!(!result.consensus_reached);
        assert_eq!(result.winning_option.unwrap().id, "x");
    }

    #[test]
    fn test_quorum_short_circuits_every_algorithm() {
        let session = session_with(&[("a", "x", 1.0), ("b", "x", 1.0)], Some(3));
        for algorithm in [
            ConsensusAlgorithm::SimpleMajority,
            ConsensusAlgorithm::WeightedMajority,
            ConsensusAlgorithm::Supermajority,
            ConsensusAlgorithm::ConsensusThreshold,
        ] {
            let result = resolve(&session, algorithm, 0.5, &Population::default());
            assert!(!result.consensus_reached);
            assert!(result.reason.unwrap().contains("quorum not met"));
        }
    }

    #[test]
    fn test_consensus_threshold_requires_every_registered_agent() {
        let agents = [
            Agent::new("a", "A"),
            Agent::new("b", "B"),
            Agent::new("c", "C"),
        ];
        let population = Population::from_agents(&agents);

        let partial = session_with(&[("a", "x", 1.0), ("b", "x", 1.0)], None);
        let result = resolve(&partial, ConsensusAlgorithm::ConsensusThreshold, 0.5, &population);
        assert!(!result.consensus_reached);
        assert!((result.confidence - 2.0 / 3.0).abs() < 1e-9);

        let unanimous = session_with(&[("a", "x", 1.0), ("b", "x", 1.0), ("c", "x", 1.0)], None);
        let result = resolve(&unanimous, ConsensusAlgorithm::ConsensusThreshold, 0.67, &population);
        assert!(result.consensus_reached);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_no_votes_has_no_winner() {
        let session = session_with(&[], None);
        let result = resolve(&session, ConsensusAlgorithm::WeightedMajority, 0.67, &Population::default());
        assert!(result.winning_option.is_none());
        assert!(!result.consensus_reached);
        assert_eq!(result.vote_distribution.len(), 2);
    }

    #[test]
    fn test_conflicts_flag_duplicates_and_races() {
        let now = Utc::now();
        let vote = |agent: &str, offset_ms: i64| Vote {
            agent_id: agent.to_string(),
            option_id: "x".to_string(),
            weight: 1.0,
            timestamp: now + Duration::milliseconds(offset_ms),
            rationale: None,
        };
        let votes = vec![vote("a", 0), vote("b", 40), vote("a", 1_000), vote("c", 5_000)];
        let conflicts = detect_conflicts(&votes);

        assert!(conflicts.contains(&VoteConflict::DuplicateVote {
            agent_id: "a".into(),
            count: 2
        }));
        assert!(conflicts.contains(&VoteConflict::PossibleRace {
            first_agent_id: "a".into(),
            second_agent_id: "b".into(),
            gap_ms: 40,
        }));
        assert_eq!(conflicts.len(), 2);
    }

    #[test]
    fn test_algorithm_parses_from_kebab_or_snake_case() {
        assert_eq!(
            "weighted_majority".parse::<ConsensusAlgorithm>().unwrap(),
            ConsensusAlgorithm::WeightedMajority
        );
        assert!("plurality".parse::<ConsensusAlgorithm>().is_err());
    }
}
