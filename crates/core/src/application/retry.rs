// Retry logic for client-side gateway calls
use crate::application::constants::{
    DEFAULT_ERROR_RETRY_DELAY_MS, DEFAULT_MAX_GATEWAY_ATTEMPTS, MAX_BACKOFF_MS,
};
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay in ms
    Retry(i64),
    /// Attempts exhausted
    GiveUp,
}

/// Exponential backoff for transient gateway failures
///
/// delay = base_delay * (backoff_factor ^ (attempt - 1)) * (1.0 ± 0.1),
/// capped at `MAX_BACKOFF_MS`. The jitter is seeded from a caller key so
/// concurrent clients spread out while a single client stays deterministic.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base_delay_ms: i64,
    backoff_factor: f64,
    max_attempts: u32,
    jitter_seed: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_RETRY_DELAY_MS, 2.0, DEFAULT_MAX_GATEWAY_ATTEMPTS)
    }
}

impl RetryPolicy {
    pub fn new(base_delay_ms: i64, backoff_factor: f64, max_attempts: u32) -> Self {
        Self {
            base_delay_ms,
            backoff_factor,
            max_attempts,
            jitter_seed: 0,
        }
    }

    /// Seed the jitter from a stable key (usually the owner id)
    pub fn with_jitter_key(mut self, key: &str) -> Self {
        self.jitter_seed = key
            .chars()
            .fold(0u32, |hash, c| hash.wrapping_mul(31).wrapping_add(c as u32));
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide what to do after the `attempt`-th consecutive failure (1-based)
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            warn!(
                attempt = attempt,
                max_attempts = self.max_attempts,
                "Max retry attempts reached"
            );
            return RetryDecision::GiveUp;
        }

        let delay_ms = self.backoff_ms(attempt);
        info!(
            attempt = attempt,
            max_attempts = self.max_attempts,
            delay_ms = delay_ms,
            "Scheduling retry"
        );
        RetryDecision::Retry(delay_ms)
    }

    pub fn backoff_ms(&self, attempt: u32) -> i64 {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let raw = self.base_delay_ms as f64 * self.backoff_factor.powi(exponent);

        // ±10% jitter against thundering herds
        let jitter_factor = 0.9 + ((self.jitter_seed % 21) as f64 / 100.0);
        let delay_ms = (raw * jitter_factor).min(MAX_BACKOFF_MS as f64);
        (delay_ms as i64).clamp(0, MAX_BACKOFF_MS)
    }

    /// Clamp a server-provided retry hint into a sane sleep
    pub fn hinted_delay_ms(&self, retry_after_ms: i64) -> i64 {
        retry_after_ms.clamp(0, MAX_BACKOFF_MS)
    }
}
