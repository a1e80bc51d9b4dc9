//! Tasks submitted for delegation.

use serde::{Deserialize, Serialize};

/// Priority of a task. Doubles as the handoff priority tier, which selects
/// the compression quality for context transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Compression quality for context transfer. Higher priority favors
    /// speed over size.
    pub fn compression_quality(self) -> u8 {
        match self {
            Priority::High => 6,
            Priority::Medium => 8,
            Priority::Low => 9,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        write!(f, "{s}")
    }
}

/// A unit of work handed to the swarm. Consumed once by `delegate_task`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        task_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            task_type: task_type.into(),
            priority: Priority::default(),
            context: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_favors_speed_for_high_priority() {
        assert_eq!(Priority::High.compression_quality(), 6);
        assert_eq!(Priority::Medium.compression_quality(), 8);
        assert_eq!(Priority::Low.compression_quality(), 9);
    }

    #[test]
    fn test_task_type_serializes_as_type() {
        let task = Task::new("t-1", "Answer questions", "qa");
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "qa");
        assert_eq!(json["priority"], "medium");
        assert!(json.get("context").is_none());
    }
}
