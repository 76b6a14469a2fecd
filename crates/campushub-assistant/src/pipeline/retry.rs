//! Retry with exponential backoff and jitter
//!
//! Separates mechanism (how retries are spaced) from policy (which errors
//! qualify, supplied by the caller as a predicate). The sleep between
//! attempts is an ordinary `.await`, so a caller-level timeout or dropped
//! future cancels cleanly mid-backoff.

use crate::error::{AssistantError, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Spacing and ceiling for retries
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first (so 4 means up to 3 retries)
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Random jitter added or subtracted from each delay
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Deterministic part of the delay: `base * 2^attempt`, capped
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        exp.min(self.max_delay)
    }

    /// Backoff delay with randomized jitter, never below zero
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_delay(attempt);
        let jitter_ms = self.max_jitter.as_millis() as i64;
        if jitter_ms == 0 {
            return base;
        }
        let offset = rand::thread_rng().gen_range(-jitter_ms..=jitter_ms);
        let delayed = base.as_millis() as i64 + offset;
        Duration::from_millis(delayed.max(0) as u64)
    }
}

/// Run `op` until it succeeds, a non-retryable error occurs, or attempts
/// exhaust. The last error is surfaced on exhaustion.
pub async fn execute_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&AssistantError) -> bool,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) && attempt + 1 < policy.max_attempts => {
                let delay = policy.jittered_delay(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    operation_name,
                    attempt + 1,
                    policy.max_attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(
                    "{} failed terminally on attempt {}/{}: {}",
                    operation_name,
                    attempt + 1,
                    policy.max_attempts,
                    e
                );
                return Err(e);
            }
        }
    }
}
