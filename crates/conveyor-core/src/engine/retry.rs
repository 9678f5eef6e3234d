//! Retry policy: per-state attempt budget and backoff delays.
//!
//! Attempt counts and backoff parameters are plain configuration data on
//! the state definition, not control flow baked into the engine, so they
//! can be tuned and tested independently. Only errors classified transient
//! consume this budget; semantic failures are routed immediately.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total executor invocations allowed (first attempt included).
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub base_delay: Duration,

    /// Backoff multiplier for subsequent attempts.
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
        }
    }

    /// No retries: one attempt, period. Used by pure transforms and
    /// best-effort steps.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay to wait after the `attempts`-th failed attempt.
    ///
    /// Exponential: `base_delay * multiplier^(attempts - 1)`.
    /// With base 2s and multiplier 2.0: 2s after the first failure, 4s
    /// after the second, 8s after the third.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(attempts.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay_secs)
    }
}
