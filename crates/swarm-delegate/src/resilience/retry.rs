//! Retry with fixed or exponential backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryPolicyConfig;
use crate::domain::error::{Result, SwarmError};
use crate::metrics::Metrics;

/// Retries transient (`SwarmError::is_transient`) failures.
///
/// Attempts = `max_retries + 1`. The delay after attempt `n` is
/// `base_delay` (fixed) or `base_delay * 2^(n-1)` (exponential).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    exponential: bool,
    metrics: Option<Arc<Metrics>>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, exponential: bool) -> Self {
        Self {
            max_retries,
            base_delay,
            exponential,
            metrics: None,
        }
    }

    pub fn from_config(config: &RetryPolicyConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            config.exponential,
        )
    }

    /// Count every retry in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff before the attempt following attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.base_delay;
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    ///
    /// A retry loop only stops between attempts; an in-flight call is never
    /// pre-empted.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    warn!(
                        event = "retry.exhausted",
                        operation = %operation,
                        attempts = attempt,
                        error = %e,
                    );
                    return Err(SwarmError::ExhaustedRetries {
                        operation: operation.to_string(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        event = "retry.scheduled",
                        operation = %operation,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_retries();
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
