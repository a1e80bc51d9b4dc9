//! Swarm configuration, named presets and aggregated validation.
//!
//! A configuration is only ever installed after [`SwarmConfig::validate`]
//! accepted it; every violated rule is reported in one [`ValidationError`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::{Result, SwarmError, ValidationError};

/// Named configuration bundle, selected as a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Development,
    #[default]
    Production,
    HighPerformance,
}

impl FromStr for Preset {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "development" | "dev" => Ok(Preset::Development),
            "production" | "prod" => Ok(Preset::Production),
            "high_performance" | "highperformance" => Ok(Preset::HighPerformance),
            other => Err(ValidationError::single(format!("unknown preset: {other}"))),
        }
    }
}

/// How the router decides that a capability matches a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Capability appears as a substring of the task description, or equals
    /// the task type.
    #[default]
    Substring,
    /// Capability equals the task type or one of the description's tokens.
    ExactTag,
}

/// Log verbosity carried by a preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Retry policy parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    /// Retries after the first attempt (0 = run once).
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Double the delay per attempt instead of keeping it fixed.
    pub exponential: bool,
}

/// Circuit breaker parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// How long an open breaker short-circuits calls.
    pub cooldown_ms: u64,
    /// Successful probes needed in half-open state to close again.
    pub success_threshold: u32,
}

/// Full configuration of a swarm delegate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    pub preset: Preset,
    /// Ideal confidence for a handoff.
    pub confidence_threshold: f64,
    /// Acceptable confidence for a handoff.
    pub minimum_confidence_for_handoff: f64,
    pub max_handoff_depth: u32,
    pub latency_target_ms: u64,
    pub max_latency_threshold_ms: u64,
    /// Soft admission ceiling; exceeding it is logged, not rejected.
    pub max_concurrent_delegations: usize,
    pub enable_local_inference: bool,
    pub enable_consensus: bool,
    /// Default threshold for supermajority and consensus-threshold votes.
    pub consensus_threshold: f64,
    pub max_votes_per_session: usize,
    pub match_strategy: MatchStrategy,
    pub log_level: LogLevel,
    pub retry: RetryPolicyConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self::preset(Preset::Production)
    }
}

impl SwarmConfig {
    /// The complete bundle for a named preset.
    ///
    /// | Preset           | Confidence (ideal/min) | Concurrency | Log   | Retries         |
    /// |------------------|------------------------|-------------|-------|-----------------|
    /// | development      | 0.6 / 0.4              | 3           | debug | 1 x 100ms fixed |
    /// | production       | 0.8 / 0.6              | 10          | info  | 3 x 500ms exp   |
    /// | high_performance | 0.9 / 0.7              | 50          | warn  | 2 x 50ms exp    |
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Development => Self {
                preset,
                confidence_threshold: 0.6,
                minimum_confidence_for_handoff: 0.4,
                max_handoff_depth: 5,
                latency_target_ms: 2_000,
                max_latency_threshold_ms: 10_000,
                max_concurrent_delegations: 3,
                enable_local_inference: true,
                enable_consensus: true,
                consensus_threshold: 0.67,
                max_votes_per_session: 64,
                match_strategy: MatchStrategy::Substring,
                log_level: LogLevel::Debug,
                retry: RetryPolicyConfig {
                    max_retries: 1,
                    base_delay_ms: 100,
                    exponential: false,
                },
                circuit_breaker: CircuitBreakerConfig {
                    failure_threshold: 10,
                    cooldown_ms: 5_000,
                    success_threshold: 1,
                },
            },
            Preset::Production => Self {
                preset,
                confidence_threshold: 0.8,
                minimum_confidence_for_handoff: 0.6,
                max_handoff_depth: 3,
                latency_target_ms: 2_000,
                max_latency_threshold_ms: 5_000,
                max_concurrent_delegations: 10,
                enable_local_inference: true,
                enable_consensus: true,
                consensus_threshold: 0.67,
                max_votes_per_session: 256,
                match_strategy: MatchStrategy::Substring,
                log_level: LogLevel::Info,
                retry: RetryPolicyConfig {
                    max_retries: 3,
                    base_delay_ms: 500,
                    exponential: true,
                },
                circuit_breaker: CircuitBreakerConfig {
                    failure_threshold: 5,
                    cooldown_ms: 30_000,
                    success_threshold: 2,
                },
            },
            Preset::HighPerformance => Self {
                preset,
                confidence_threshold: 0.9,
                minimum_confidence_for_handoff: 0.7,
                max_handoff_depth: 2,
                latency_target_ms: 1_000,
                max_latency_threshold_ms: 2_000,
                max_concurrent_delegations: 50,
                enable_local_inference: true,
                enable_consensus: true,
                consensus_threshold: 0.67,
                max_votes_per_session: 1_024,
                match_strategy: MatchStrategy::Substring,
                log_level: LogLevel::Warn,
                retry: RetryPolicyConfig {
                    max_retries: 2,
                    base_delay_ms: 50,
                    exponential: true,
                },
                circuit_breaker: CircuitBreakerConfig {
                    failure_threshold: 3,
                    cooldown_ms: 10_000,
                    success_threshold: 1,
                },
            },
        }
    }

    /// Check every rule and report all violations together.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut violations = Vec::new();

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            violations.push(format!(
                "confidence_threshold must be in [0, 1] (got {})",
                self.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.minimum_confidence_for_handoff) {
            violations.push(format!(
                "minimum_confidence_for_handoff must be in [0, 1] (got {})",
                self.minimum_confidence_for_handoff
            ));
        }
        if self.confidence_threshold < self.minimum_confidence_for_handoff {
            violations.push(format!(
                "confidence_threshold ({}) must be >= minimum_confidence_for_handoff ({})",
                self.confidence_threshold, self.minimum_confidence_for_handoff
            ));
        }
        if self.max_handoff_depth == 0 {
            violations.push("max_handoff_depth must be at least 1".to_string());
        }
        if self.latency_target_ms == 0 {
            violations.push("latency_target_ms must be greater than 0".to_string());
        }
        if self.max_latency_threshold_ms < self.latency_target_ms {
            violations.push(format!(
                "max_latency_threshold_ms ({}) must be >= latency_target_ms ({})",
                self.max_latency_threshold_ms, self.latency_target_ms
            ));
        }
        if self.max_concurrent_delegations == 0 {
            violations.push("max_concurrent_delegations must be at least 1".to_string());
        }
        if !(self.consensus_threshold > 0.0 && self.consensus_threshold <= 1.0) {
            violations.push(format!(
                "consensus_threshold must be in (0, 1] (got {})",
                self.consensus_threshold
            ));
        }
        if self.max_votes_per_session == 0 {
            violations.push("max_votes_per_session must be at least 1".to_string());
        }
        if self.retry.max_retries > 10 {
            violations.push(format!(
                "retry.max_retries must be <= 10 (got {})",
                self.retry.max_retries
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            violations.push("circuit_breaker.failure_threshold must be at least 1".to_string());
        }
        if self.circuit_breaker.success_threshold == 0 {
            violations.push("circuit_breaker.success_threshold must be at least 1".to_string());
        }

        ValidationError::check(violations)
    }

    /// Merge `patch` into a copy and return it only if the result is valid.
    pub fn merged(&self, patch: &SwarmConfigPatch) -> std::result::Result<Self, ValidationError> {
        let mut next = match patch.preset {
            Some(preset) if preset != self.preset => Self::preset(preset),
            _ => self.clone(),
        };
        patch.apply_to(&mut next);
        next.validate()?;
        Ok(next)
    }

    /// Parse a TOML document: an optional `preset` key selects the base
    /// bundle and the remaining keys override it.
    ///
    /// ```toml
    /// preset = "development"
    /// confidence_threshold = 0.75
    ///
    /// [retry]
    /// max_retries = 2
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let patch: SwarmConfigPatch = toml::from_str(source)
            .map_err(|e| ValidationError::single(format!("invalid config file: {e}")))?;
        let base = Self::preset(patch.preset.unwrap_or_default());
        Ok(base.merged(&patch)?)
    }

    /// Read and parse a TOML configuration file (see [`SwarmConfig::from_toml_str`]).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::single(format!("cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Build a configuration from `SWARM_*` environment variables on top of
    /// the preset named by `SWARM_PRESET` (default `production`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SwarmConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut violations = Vec::new();
        let mut patch = SwarmConfigPatch::default();

        let preset = match lookup("SWARM_PRESET") {
            Some(raw) => match raw.parse::<Preset>() {
                Ok(p) => p,
                Err(e) => {
                    violations.extend(e.violations);
                    Preset::default()
                }
            },
            None => Preset::default(),
        };

        fn parse<T: FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
            violations: &mut Vec<String>,
        ) -> Option<T> {
            let raw = lookup(key)?;
            match raw.trim().parse::<T>() {
                Ok(v) => Some(v),
                Err(_) => {
                    violations.push(format!("{key} has an invalid value: {raw}"));
                    None
                }
            }
        }

        patch.confidence_threshold = parse(&lookup, "SWARM_CONFIDENCE_THRESHOLD", &mut violations);
        patch.minimum_confidence_for_handoff =
            parse(&lookup, "SWARM_MIN_CONFIDENCE", &mut violations);
        patch.max_handoff_depth = parse(&lookup, "SWARM_MAX_HANDOFF_DEPTH", &mut violations);
        patch.latency_target_ms = parse(&lookup, "SWARM_LATENCY_TARGET_MS", &mut violations);
        patch.max_latency_threshold_ms = parse(&lookup, "SWARM_MAX_LATENCY_MS", &mut violations);
        patch.max_concurrent_delegations =
            parse(&lookup, "SWARM_MAX_CONCURRENT", &mut violations);
        patch.enable_local_inference =
            parse(&lookup, "SWARM_ENABLE_LOCAL_INFERENCE", &mut violations);

        let base = Self::preset(preset);
        let mut next = base.clone();
        patch.apply_to(&mut next);
        if let Err(e) = next.validate() {
            violations.extend(e.violations);
        }
        if !violations.is_empty() {
            return Err(SwarmError::Validation(ValidationError::new(violations)));
        }
        Ok(next)
    }
}

/// Partial retry policy update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicyPatch {
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub exponential: Option<bool>,
}

/// Partial circuit breaker update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerPatch {
    pub failure_threshold: Option<u32>,
    pub cooldown_ms: Option<u64>,
    pub success_threshold: Option<u32>,
}

/// Partial configuration update for `update_config`. Unset fields keep their
/// current value; setting `preset` first swaps in that whole bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfigPatch {
    pub preset: Option<Preset>,
    pub confidence_threshold: Option<f64>,
    pub minimum_confidence_for_handoff: Option<f64>,
    pub max_handoff_depth: Option<u32>,
    pub latency_target_ms: Option<u64>,
    pub max_latency_threshold_ms: Option<u64>,
    pub max_concurrent_delegations: Option<usize>,
    pub enable_local_inference: Option<bool>,
    pub enable_consensus: Option<bool>,
    pub consensus_threshold: Option<f64>,
    pub max_votes_per_session: Option<usize>,
    pub match_strategy: Option<MatchStrategy>,
    pub log_level: Option<LogLevel>,
    pub retry: Option<RetryPolicyPatch>,
    pub circuit_breaker: Option<CircuitBreakerPatch>,
}

impl SwarmConfigPatch {
    fn apply_to(&self, cfg: &mut SwarmConfig) {
        let patch = self;
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = patch.$field { cfg.$field = v; })*
            };
        }
        set!(
            confidence_threshold,
            minimum_confidence_for_handoff,
            max_handoff_depth,
            latency_target_ms,
            max_latency_threshold_ms,
            max_concurrent_delegations,
            enable_local_inference,
            enable_consensus,
            consensus_threshold,
            max_votes_per_session,
            match_strategy,
            log_level,
        );
        if let Some(retry) = &self.retry {
            if let Some(v) = retry.max_retries {
                cfg.retry.max_retries = v;
            }
            if let Some(v) = retry.base_delay_ms {
                cfg.retry.base_delay_ms = v;
            }
            if let Some(v) = retry.exponential {
                cfg.retry.exponential = v;
            }
        }
        if let Some(cb) = &self.circuit_breaker {
            if let Some(v) = cb.failure_threshold {
                cfg.circuit_breaker.failure_threshold = v;
            }
            if let Some(v) = cb.cooldown_ms {
                cfg.circuit_breaker.cooldown_ms = v;
            }
            if let Some(v) = cb.success_threshold {
                cfg.circuit_breaker.success_threshold = v;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_every_preset_is_valid() {
        for preset in [
            Preset::Development,
            Preset::Production,
            Preset::HighPerformance,
        ] {
            let cfg = SwarmConfig::preset(preset);
            assert!(cfg.validate().is_ok(), "{preset:?} preset must validate");
            assert!(cfg.confidence_threshold >= cfg.minimum_confidence_for_handoff);
            assert!(cfg.max_latency_threshold_ms >= cfg.latency_target_ms);
        }
    }

    #[test]
    fn test_presets_differ_as_whole_bundles() {
        let dev = SwarmConfig::preset(Preset::Development);
        let hp = SwarmConfig::preset(Preset::HighPerformance);
        assert!(dev.confidence_threshold < hp.confidence_threshold);
        assert!(dev.max_concurrent_delegations < hp.max_concurrent_delegations);
        assert_eq!(dev.log_level, LogLevel::Debug);
        assert_eq!(hp.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_validate_aggregates_all_violations() {
        let mut cfg = SwarmConfig::default();
        cfg.confidence_threshold = 0.3;
        cfg.minimum_confidence_for_handoff = 0.5;
        cfg.latency_target_ms = 3_000;
        cfg.max_latency_threshold_ms = 1_000;
        cfg.max_handoff_depth = 0;

        let err = cfg.validate().unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.violations[0].contains("minimum_confidence_for_handoff"));
        assert!(err.violations.iter().any(|v| v.contains("max_handoff_depth")));
        assert!(err
            .violations
            .iter()
            .any(|v| v.contains("max_latency_threshold_ms")));
    }

    #[test]
    fn test_merged_rejects_invalid_patch_and_keeps_original() {
        let cfg = SwarmConfig::default();
        let patch = SwarmConfigPatch {
            minimum_confidence_for_handoff: Some(0.95),
            ..Default::default()
        };
        assert!(cfg.merged(&patch).is_err());
        assert_eq!(cfg.minimum_confidence_for_handoff, 0.6);
    }

    #[test]
    fn test_merged_with_preset_swaps_bundle_then_applies_overrides() {
        let cfg = SwarmConfig::default();
        let patch = SwarmConfigPatch {
            preset: Some(Preset::Development),
            max_concurrent_delegations: Some(7),
            ..Default::default()
        };
        let next = cfg.merged(&patch).unwrap();
        assert_eq!(next.preset, Preset::Development);
        assert_eq!(next.confidence_threshold, 0.6);
        assert_eq!(next.max_concurrent_delegations, 7);
    }

    #[test]
    fn test_toml_selects_preset_and_overrides() {
        let cfg = SwarmConfig::from_toml_str(
            r#"
            preset = "high_performance"
            latency_target_ms = 1500

            [retry]
            max_retries = 4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.preset, Preset::HighPerformance);
        assert_eq!(cfg.latency_target_ms, 1_500);
        assert_eq!(cfg.retry.max_retries, 4);
        assert_eq!(cfg.retry.base_delay_ms, 50);
    }

    #[test]
    fn test_toml_with_invalid_combination_is_validation_error() {
        let err = SwarmConfig::from_toml_str("latency_target_ms = 9000").unwrap_err();
        assert!(matches!(err, SwarmError::Validation(_)));
    }

    #[test]
    fn test_env_lookup_applies_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SWARM_PRESET", "development"),
            ("SWARM_MAX_CONCURRENT", "8"),
            ("SWARM_ENABLE_LOCAL_INFERENCE", "false"),
        ]);
        let cfg = SwarmConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.preset, Preset::Development);
        assert_eq!(cfg.max_concurrent_delegations, 8);
        assert!(!cfg.enable_local_inference);
    }

    #[test]
    fn test_env_lookup_reports_parse_and_rule_violations_together() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SWARM_PRESET", "staging"),
            ("SWARM_MAX_HANDOFF_DEPTH", "many"),
            ("SWARM_MIN_CONFIDENCE", "0.99"),
        ]);
        let err = SwarmConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap_err();
        match err {
            SwarmError::Validation(v) => {
                assert_eq!(v.violations.len(), 3, "{:?}", v.violations);
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
