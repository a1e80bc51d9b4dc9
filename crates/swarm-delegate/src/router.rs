//! Task router: capability-keyword scoring over the live agent registry.
//!
//! Confidence is the share of an agent's capabilities that match the task,
//! in [0, 1]. Ties go to the lower current workload, then to the larger
//! capacity headroom, then to the smaller id so ranking is deterministic.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::MatchStrategy;
use crate::domain::agent::Agent;
use crate::domain::error::{Result, SwarmError};
use crate::domain::task::Task;

/// One scored routing candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub agent: Agent,
    pub confidence: f64,
    pub reasoning: String,
}

/// Scores agents against a task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskRouter {
    strategy: MatchStrategy,
}

impl TaskRouter {
    pub fn new(strategy: MatchStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Capabilities of `agent` that match `task`, in sorted order.
    pub fn matched_capabilities<'a>(&self, task: &Task, agent: &'a Agent) -> Vec<&'a str> {
        let description = task.description.to_lowercase();
        let task_type = task.task_type.to_lowercase();
        let tokens: BTreeSet<&str> = match self.strategy {
            MatchStrategy::ExactTag => description
                .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
                .filter(|t| !t.is_empty())
                .collect(),
            MatchStrategy::Substring => BTreeSet::new(),
        };

        agent
            .capabilities
            .iter()
            .filter(|cap| {
                let cap = cap.to_lowercase();
                if cap.is_empty() {
                    return false;
                }
                if cap == task_type {
                    return true;
                }
                match self.strategy {
                    MatchStrategy::Substring => description.contains(&cap),
                    MatchStrategy::ExactTag => tokens.contains(cap.as_str()),
                }
            })
            .map(String::as_str)
            .collect()
    }

    /// Confidence in [0, 1] that `agent` fits `task`. Zero for an agent with
    /// no capabilities.
    pub fn confidence(&self, task: &Task, agent: &Agent) -> f64 {
        if agent.capabilities.is_empty() {
            return 0.0;
        }
        self.matched_capabilities(task, agent).len() as f64 / agent.capabilities.len() as f64
    }

    /// Every agent scored and ordered best first.
    pub fn rank(&self, task: &Task, agents: &[Agent]) -> Vec<RouteCandidate> {
        let mut candidates: Vec<RouteCandidate> = agents
            .iter()
            .map(|agent| {
                let matched = self.matched_capabilities(task, agent);
                let confidence = if agent.capabilities.is_empty() {
                    0.0
                } else {
                    matched.len() as f64 / agent.capabilities.len() as f64
                };
                let reasoning = if matched.is_empty() {
                    format!(
                        "no capability of {} matches task type '{}'",
                        agent.id, task.task_type
                    )
                } else {
                    format!(
                        "{}/{} capabilities match ({}); workload {}/{}",
                        matched.len(),
                        agent.capabilities.len(),
                        matched.join(", "),
                        agent.workload,
                        agent.capacity
                    )
                };
                RouteCandidate {
                    agent: agent.clone(),
                    confidence,
                    reasoning,
                }
            })
            .collect();
        candidates.sort_by(compare_candidates);
        candidates
    }

    /// Best candidate for `task`. `SwarmError::Capacity` when `agents` is empty.
    pub fn route(&self, task: &Task, agents: &[Agent]) -> Result<RouteCandidate> {
        self.rank(task, agents)
            .into_iter()
            .next()
            .ok_or_else(|| SwarmError::Capacity("no agents registered".to_string()))
    }
}

fn compare_candidates(a: &RouteCandidate, b: &RouteCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.agent.workload.cmp(&b.agent.workload))
        .then_with(|| b.agent.headroom().cmp(&a.agent.headroom()))
        .then_with(|| a.agent.id.cmp(&b.agent.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qa_task() -> Task {
        Task::new("t-1", "Answer questions about a document", "qa")
    }

    #[test]
    fn test_routes_to_capability_match() {
        let a = Agent::new("a", "A")
            .with_capabilities(["qa", "text-comprehension"])
            .with_capacity(8)
            .local();
        let b = Agent::new("b", "B").with_capabilities(["image-recognition"]);

        let best = TaskRouter::default().route(&qa_task(), &[b, a]).unwrap();
        assert_eq!(best.agent.id, "a");
        assert_eq!(best.confidence, 0.5);
        assert!(best.reasoning.contains("qa"));
    }

    #[test]
    fn test_empty_registry_is_capacity_error() {
        let err = TaskRouter::default().route(&qa_task(), &[]).unwrap_err();
        assert!(matches!(err, SwarmError::Capacity(_)));
    }

    #[test]
    fn test_ties_prefer_lower_workload_then_headroom() {
        let busy = Agent::new("busy", "Busy")
            .with_capabilities(["qa"])
            .with_capacity(10)
            .with_workload(3);
        let idle_small = Agent::new("idle-small", "Idle small")
            .with_capabilities(["qa"])
            .with_capacity(2);
        let idle_large = Agent::new("idle-large", "Idle large")
            .with_capabilities(["qa"])
            .with_capacity(6);

        let ranked = TaskRouter::default().rank(&qa_task(), &[busy, idle_small, idle_large]);
        let ids: Vec<_> = ranked.iter().map(|c| c.agent.id.as_str()).collect();
        assert_eq!(ids, vec!["idle-large", "idle-small", "busy"]);
    }

    #[test]
    fn test_substring_collision_matches_but_exact_tag_does_not() {
        let task = Task::new("t-2", "Summarize the category tree", "summarize");
        let agent = Agent::new("cat", "Cat").with_capabilities(["cat"]);

        assert_eq!(TaskRouter::new(MatchStrategy::Substring).confidence(&task, &agent), 1.0);
        assert_eq!(TaskRouter::new(MatchStrategy::ExactTag).confidence(&task, &agent), 0.0);
    }

    #[test]
    fn test_exact_tag_matches_whole_tokens() {
        let task = Task::new("t-3", "Run code-review on this patch", "review");
        let agent = Agent::new("r", "R").with_capabilities(["code-review", "review", "deploy"]);
        let matched = TaskRouter::new(MatchStrategy::ExactTag).matched_capabilities(&task, &agent);
        assert_eq!(matched, vec!["code-review", "review"]);
    }

    #[test]
    fn test_agent_without_capabilities_scores_zero() {
        let agent = Agent::new("blank", "Blank");
        assert_eq!(TaskRouter::default().confidence(&qa_task(), &agent), 0.0);
    }
}
