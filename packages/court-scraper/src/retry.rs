//! Bounded retry for external API calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::ScrapeError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Pause before the single retry allowed after a rate-limit response.
    pub rate_limit_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(10_000),
            rate_limit_pause: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    /// Never retry. Useful in tests.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            rate_limit_pause: Duration::ZERO,
        }
    }

    /// Run `f`, retrying transient failures with exponential backoff.
    ///
    /// A rate-limit response gets exactly one retry after `rate_limit_pause`;
    /// a second one is returned to the caller. Every other error is returned
    /// immediately.
    pub async fn run<F, Fut, T>(&self, operation: &'static str, mut f: F) -> Result<T, ScrapeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>>,
    {
        let mut attempt: u32 = 0;
        let mut backoff = self.initial_backoff;
        let mut paused_for_rate_limit = false;

        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(operation, attempts = attempt + 1, "Succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_rate_limited() && !paused_for_rate_limit => {
                    paused_for_rate_limit = true;
                    tracing::warn!(
                        operation,
                        pause_ms = self.rate_limit_pause.as_millis() as u64,
                        "Rate limited, pausing before one more attempt"
                    );
                    sleep(self.rate_limit_pause).await;
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
