//! Handoff decision engine: confidence gating, depth cap, latency tiers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{SwarmConfig, SwarmConfigPatch};
use crate::domain::error::ValidationError;
use crate::obs;

/// Outcome of [`HandoffDecisionEngine::check_latency_thresholds`]. Both tiers
/// are reporting-only; neither aborts the operation that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyReport {
    pub latency_ms: u64,
    /// Over `latency_target_ms`.
    pub soft_breach: bool,
    /// Over `max_latency_threshold_ms`.
    pub hard_breach: bool,
}

impl LatencyReport {
    pub fn within_target(&self) -> bool {
        !self.soft_breach
    }
}

/// Holds a validated configuration and answers "should this task move?".
#[derive(Debug, Clone)]
pub struct HandoffDecisionEngine {
    config: SwarmConfig,
}

impl HandoffDecisionEngine {
    /// Validate `config` and wrap it. Every violated rule is reported.
    pub fn new(config: SwarmConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Apply a partial update. The live configuration is left untouched when
    /// the merged result is invalid.
    pub fn update(&mut self, patch: &SwarmConfigPatch) -> Result<&SwarmConfig, ValidationError> {
        self.config = self.config.merged(patch)?;
        Ok(&self.config)
    }

    /// `true` only when `confidence` clears both the acceptable and the ideal
    /// threshold and the handoff chain is still below the depth cap.
    pub fn should_handoff(&self, confidence: f64, current_depth: u32) -> bool {
        let acceptable = confidence >= self.config.minimum_confidence_for_handoff;
        let ideal = confidence >= self.config.confidence_threshold;
        let within_depth = current_depth < self.config.max_handoff_depth;
        let decision = acceptable && ideal && within_depth;
        debug!(
            event = "handoff.decision",
            confidence = confidence,
            depth = current_depth,
            acceptable = acceptable,
            ideal = ideal,
            within_depth = within_depth,
            decision = decision,
        );
        decision
    }

    /// Whether a further hop is permitted at `current_depth`, ignoring
    /// confidence.
    pub fn within_depth(&self, current_depth: u32) -> bool {
        current_depth < self.config.max_handoff_depth
    }

    /// Classify `latency_ms` against the soft target and the hard maximum,
    /// logging each breach.
    pub fn check_latency_thresholds(&self, latency_ms: u64) -> LatencyReport {
        let report = LatencyReport {
            latency_ms,
            soft_breach: latency_ms > self.config.latency_target_ms,
            hard_breach: latency_ms > self.config.max_latency_threshold_ms,
        };
        if report.hard_breach {
            obs::emit_latency_hard_breach(latency_ms, self.config.max_latency_threshold_ms);
        } else if report.soft_breach {
            obs::emit_latency_soft_breach(latency_ms, self.config.latency_target_ms);
        }
        report
    }
}
