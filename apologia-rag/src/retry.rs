//! Bounded retry with jittered exponential backoff.
//!
//! Hosted capabilities rate-limit and flake; a bounded loop with an explicit
//! attempt cap keeps that resilience from turning into an unbounded retry.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::Result;

/// A bounded retry policy: `max_attempts` tries, exponential delay doubling
/// from `base_delay`, with up to 50% random jitter added to each delay.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    /// Run `operation`, retrying on retryable errors until `max_attempts`
    /// is exhausted. Non-retryable errors return immediately.
    pub async fn run<T, F, Fut>(&self, call: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        call,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retryable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << (attempt - 1).min(16));
        let jitter_cap = (exp.as_millis() as u64 / 2).max(1);
        let jitter = rand::rng().random_range(0..jitter_cap);
        exp + Duration::from_millis(jitter)
    }
}
