//! Resilience layer wrapped around every backend call.
//!
//! Three independently composable policies:
//!
//! - [`RetryPolicy`] retries transient failures with fixed or exponential
//!   backoff, then raises `ExhaustedRetries`
//! - [`CircuitBreaker`] short-circuits calls against a target after
//!   consecutive failures, for a cooldown window, then probes half-open
//! - [`FallbackChain`] walks alternate backends of the same agent before
//!   escalating to the least-loaded other agent

pub mod breaker;
pub mod fallback;
pub mod retry;

pub use breaker::{BreakerState, CircuitBreaker, CircuitBreakerRegistry};
pub use fallback::{FallbackAttempt, FallbackChain, FallbackOutcome};
pub use retry::RetryPolicy;
