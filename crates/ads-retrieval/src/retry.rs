//! Bounded retries with exponential backoff, and per-call timeouts.

use std::future::Future;
use std::time::Duration;

use ads_core::RetryConfig;
use tracing::warn;

use crate::error::{Result, RetrievalError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// A single attempt.
    pub fn none() -> Self {
        Self { max_attempts: 1, initial_backoff: Duration::ZERO, max_backoff: Duration::ZERO }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error, or
    /// the attempts run out. The last error is returned.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(e) if e.is_retryable() && tries < self.max_attempts => {
                    let delay = self.backoff_for(tries);
                    warn!(operation, attempt = tries, delay_ms = delay.as_millis() as u64, error = %e, "retrying");
                    tokio::time::sleep(delay).await;
                    tries += 1;
                }
                other => return other,
            }
        }
    }
}

/// Await `fut` for at most `limit`, converting its error into ours.
pub async fn timed<T, E, Fut>(operation: &'static str, limit: Duration, fut: Fut) -> Result<T>
where
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<RetrievalError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(RetrievalError::Timeout { operation, after: limit }),
    }
}
