//! crates/startpage_core/src/retry.rs
//!
//! Bounded retry with exponential backoff for outbound calls.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::ports::{PortError, PortResult};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(5),
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (1-based): doubles every time, capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempts run out. The closure receives the zero-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> PortResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = PortResult<T>>,
{
    let mut last_error = None;
    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
        }
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < policy.max_attempts => {
                debug!(attempt, error = %e, "Retryable failure, backing off");
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_error.unwrap_or_else(|| PortError::Unexpected("no attempts were made".into())))
}
