//! Fire-and-forget event fan-out over a tokio broadcast channel.
//!
//! Notifications are never required for correctness: publishing with no
//! subscribers, or to a lagging subscriber, is silently tolerated.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::consensus::ConsensusAlgorithm;
use crate::domain::delegation::DelegationPath;

/// Lifecycle notifications published by the delegation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwarmEvent {
    HandoffStarted {
        handoff_id: String,
        source_agent_id: String,
        target_agent_id: String,
        task_id: String,
    },
    HandoffCompleted {
        handoff_id: String,
        target_agent_id: String,
    },
    HandoffFailed {
        handoff_id: String,
        error: String,
    },
    VoteCast {
        session_id: String,
        agent_id: String,
        option_id: String,
        weight: f64,
    },
    SessionClosed {
        session_id: String,
        algorithm: ConsensusAlgorithm,
        consensus_reached: bool,
        winning_option_id: Option<String>,
    },
    DelegationFinished {
        task_id: String,
        success: bool,
        path: DelegationPath,
        agent_id: Option<String>,
        duration_ms: u64,
    },
}

/// Broadcast bus for [`SwarmEvent`]s. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SwarmEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// `capacity` events are buffered per subscriber before the oldest drop.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to all current subscribers. Never fails.
    pub fn publish(&self, event: SwarmEvent) {
        if self.sender.send(event).is_err() {
            debug!("no subscribers listening to swarm event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwarmEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        bus.publish(SwarmEvent::HandoffFailed {
            handoff_id: "h-1".into(),
            error: "boom".into(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(SwarmEvent::HandoffCompleted {
            handoff_id: "h-1".into(),
            target_agent_id: "a".into(),
        });
        match rx.recv().await.unwrap() {
            SwarmEvent::HandoffCompleted { handoff_id, .. } => assert_eq!(handoff_id, "h-1"),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
