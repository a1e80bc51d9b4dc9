//! Integration tests for configuration loading and live updates.

use std::collections::HashMap;
use std::io::Write;

use swarm_delegate::{
    Agent, MatchStrategy, Preset, RetryPolicyPatch, SwarmConfig, SwarmConfigPatch,
    SwarmDelegate, SwarmError, VoteOption,
};

fn violations(err: SwarmError) -> Vec<String> {
    match err {
        SwarmError::Validation(v) => v.violations,
        other => panic!("expected Validation, got {other:?}"),
    }
}

// ── Validation ──

#[test]
fn invalid_combinations_are_reported_together() {
    let cases: Vec<(SwarmConfigPatch, usize)> = vec![
        (
            SwarmConfigPatch {
                confidence_threshold: Some(1.5),
                ..Default::default()
            },
            1,
        ),
        (
            SwarmConfigPatch {
                confidence_threshold: Some(0.2),
                minimum_confidence_for_handoff: Some(0.4),
                max_concurrent_delegations: Some(0),
                ..Default::default()
            },
            2,
        ),
        (
            SwarmConfigPatch {
                latency_target_ms: Some(0),
                consensus_threshold: Some(0.0),
                max_votes_per_session: Some(0),
                retry: Some(RetryPolicyPatch {
                    max_retries: Some(11),
                    ..Default::default()
                }),
                ..Default::default()
            },
            4,
        ),
    ];

    let base = SwarmConfig::default();
    for (patch, expected) in cases {
        let err = base.merged(&patch).unwrap_err();
        assert_eq!(err.violations.len(), expected, "{:?}", err.violations);
    }
}

#[test]
fn default_is_the_production_bundle() {
    assert_eq!(SwarmConfig::default(), SwarmConfig::preset(Preset::Production));
}

// ── File loading ──

#[test]
fn from_file_reads_preset_and_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
preset = "development"
confidence_threshold = 0.75
match_strategy = "exact_tag"

[circuit_breaker]
failure_threshold = 4
"#
    )
    .unwrap();

    let cfg = SwarmConfig::from_file(file.path()).unwrap();
    assert_eq!(cfg.preset, Preset::Development);
    assert_eq!(cfg.confidence_threshold, 0.75);
    assert_eq!(cfg.minimum_confidence_for_handoff, 0.4);
    assert_eq!(cfg.match_strategy, MatchStrategy::ExactTag);
    assert_eq!(cfg.circuit_breaker.failure_threshold, 4);
    assert_eq!(cfg.circuit_breaker.cooldown_ms, 5_000);
}

#[test]
fn from_file_missing_path_is_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SwarmConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    let v = violations(err);
    assert!(v[0].contains("cannot read config file"));
}

#[test]
fn from_file_malformed_toml_is_validation_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "confidence_threshold = [").unwrap();
    let v = violations(SwarmConfig::from_file(file.path()).unwrap_err());
    assert!(v[0].contains("invalid config file"));
}

// ── Environment ──

#[test]
fn env_lookup_defaults_to_production() {
    let cfg = SwarmConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, SwarmConfig::default());
}

#[test]
fn env_lookup_collects_every_unparsable_value() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("SWARM_CONFIDENCE_THRESHOLD", "high"),
        ("SWARM_LATENCY_TARGET_MS", "-5"),
        ("SWARM_ENABLE_LOCAL_INFERENCE", "maybe"),
    ]);
    let v = violations(
        SwarmConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap_err(),
    );
    assert_eq!(v.len(), 3, "{v:?}");
    assert!(v.iter().all(|m| m.contains("has an invalid value")));
}

// ── Live updates ──

#[tokio::test]
async fn update_config_swaps_preset_bundle() {
    let delegate = SwarmDelegate::new(SwarmConfig::default()).unwrap();
    let updated = delegate
        .update_config(SwarmConfigPatch {
            preset: Some(Preset::HighPerformance),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(updated, SwarmConfig::preset(Preset::HighPerformance));
    assert_eq!(delegate.get_config().await, updated);
    assert!(!delegate.should_handoff(0.85, 0).await);
    assert!(delegate.should_handoff(0.95, 0).await);
    assert!(!delegate.should_handoff(0.95, 2).await);
}

#[tokio::test]
async fn update_config_rejection_reports_all_violations() {
    let delegate = SwarmDelegate::new(SwarmConfig::default()).unwrap();
    let err = delegate
        .update_config(SwarmConfigPatch {
            max_handoff_depth: Some(0),
            max_concurrent_delegations: Some(0),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(violations(err).len(), 2);
    assert_eq!(delegate.get_config().await, SwarmConfig::default());
}

#[tokio::test]
async fn update_config_applies_vote_cap_to_existing_engine() {
    let delegate = SwarmDelegate::new(SwarmConfig::default()).unwrap();
    for id in ["a", "b"] {
        delegate.register_agent(Agent::new(id, id)).await.unwrap();
    }
    delegate
        .update_config(SwarmConfigPatch {
            max_votes_per_session: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();

    let session = delegate
        .create_voting_session("cap", vec![VoteOption::new("x", "X")], None)
        .await
        .unwrap();
    assert!(delegate.cast_vote(&session, "a", "x", None).await.unwrap());
    let err = delegate
        .cast_vote(&session, "b", "x", None)
        .await
        .unwrap_err();
    assert!(matches!(err, SwarmError::Capacity(_)));
}
