//! Bounded retry with exponential backoff for market-data fetches

use crate::config::AnalystConfig;
use crate::error::{AnalystError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// How often and how patiently a failed fetch is repeated
///
/// Only [`AnalystError::is_retryable`] errors are repeated. Everything
/// else, `DataUnavailable` included, is returned on the first failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AnalystConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AnalystConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.retry_backoff_base,
            max_backoff: config.retry_backoff_max,
            backoff_multiplier: 2.0,
        }
    }

    /// Delay before retry number `retry` (1-based)
    fn backoff_duration(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let millis = self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let backoff = Duration::from_millis(millis.min(u64::MAX as f64) as u64);
        backoff.min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails for good or runs out of attempts
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(operation = operation_name, attempt, attempts, "Attempting");

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    debug!(operation = operation_name, error = %e, "Non-retryable failure");
                    return Err(e);
                }
                Err(e) if attempt >= attempts => {
                    warn!(operation = operation_name, attempts, error = %e, "Giving up");
                    return Err(e);
                }
                Err(e) => {
                    let backoff = self.backoff_duration(attempt);
                    warn!(
                        operation = operation_name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Retrying after failure"
                    );
                    sleep(backoff).await;
                }
            }
        }
    }
}

/// Bound a single call by `limit`, mapping expiry to an upstream failure
pub async fn with_timeout<T>(
    provider: &str,
    limit: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AnalystError::upstream(
            provider,
            format!("timed out after {}s", limit.as_secs()),
        )),
    }
}
