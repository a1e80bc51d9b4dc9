//! Global tracing setup for processes embedding the swarm delegate.
//!
//! `RUST_LOG` wins over the configured level. Installing a subscriber twice
//! is a no-op, so library tests and host binaries may both call in.

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::SwarmConfig;

/// Output encoding of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    /// `SWARM_LOG_FORMAT=json` selects JSON; anything else is pretty output.
    pub fn from_env() -> Self {
        match std::env::var("SWARM_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global subscriber. Closing a `swarm.delegation` span logs its
/// busy/idle time, which gives one duration line per delegation.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(format: LogFormat, level: Level) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_span_events(FmtSpan::CLOSE))
            .try_init(),
    };
    installed.is_ok()
}

/// [`init_tracing`] at the level carried by the config's preset, with the
/// format taken from `SWARM_LOG_FORMAT`.
pub fn init_tracing_from_config(config: &SwarmConfig) -> bool {
    init_tracing(LogFormat::from_env(), config.log_level.into())
}
