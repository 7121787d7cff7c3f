//! Bounded retry policy for transient fetch failures.
//!
//! Kept independent of the fetch mechanism so the schedule and the
//! retriable-error classification are testable without network calls.

use std::time::Duration;

use crate::errors::FetchError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per entry, including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following the given failed attempt (1-based).
    ///
    /// Doubles per attempt from the base delay, capped at `max_delay_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Whether the given failed attempt (1-based) should be followed by
    /// another one.
    pub fn should_retry(&self, attempt: u32, error: &FetchError) -> bool {
        attempt < self.max_attempts && error.is_retriable()
    }
}
