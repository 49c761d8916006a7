//! Retry policies and the attempt loop.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Decides, after a failed attempt, whether to try again and after what delay.
pub trait ResiliencePolicy: Send + Sync {
    /// `failed_attempts` counts the attempts made so far (1 after the first failure).
    fn should_retry(&self, failed_attempts: u32, error: &Error) -> Option<Duration>;
}

/// Linear backoff: waits `base_delay * n` before attempt `n`.
///
/// Only transient failures are retried: connection errors, timeouts and 5xx
/// responses. Any 4xx response propagates immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl LinearBackoff {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl ResiliencePolicy for LinearBackoff {
    fn should_retry(&self, failed_attempts: u32, error: &Error) -> Option<Duration> {
        if failed_attempts > self.max_retries || !error.is_retryable() {
            return None;
        }
        Some(self.delay_for_attempt(failed_attempts))
    }
}

/// Exponential backoff: waits `unit * 2^(n-1)` before attempt `n`.
///
/// Retries every failure except 4xx responses and errors raised before the
/// request was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub max_retries: u32,
    pub unit: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            max_retries: 3,
            unit: Duration::from_millis(1_000),
        }
    }
}

impl ExponentialBackoff {
    pub fn new(max_retries: u32, unit: Duration) -> Self {
        Self { max_retries, unit }
    }

    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.unit.saturating_mul(factor)
    }
}

impl ResiliencePolicy for ExponentialBackoff {
    fn should_retry(&self, failed_attempts: u32, error: &Error) -> Option<Duration> {
        if failed_attempts > self.max_retries || error.is_client_error() || error.is_local() {
            return None;
        }
        Some(self.delay_for_attempt(failed_attempts))
    }
}

/// Run `operation` until it succeeds or `policy` gives up.
///
/// Attempts are strictly serial. When the policy declines, the last error is
/// returned unchanged.
pub async fn execute_with_retry<T, F, Fut>(policy: &dyn ResiliencePolicy, mut operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation(attempt).await {
            Ok(v) => {
                if attempt > 0 {
                    debug!(attempt, "request succeeded after retry");
                }
                return Ok(v);
            }
            Err(e) => {
                attempt += 1;
                match policy.should_retry(attempt, &e) {
                    Some(delay) => {
                        warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            http_status = e.status(),
                            error = %e,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                }
            }
        }
    }
}
