//! Retry policy for API calls.

use std::future::Future;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use genie_core::Result;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET;

/// Retry behavior for failed API calls.
///
/// Only errors for which [`Error::is_retryable`](genie_core::Error::is_retryable)
/// holds are retried: network failures, timeouts, rate limits and server
/// errors. The wait before retry `n` (zero-based) is
/// `initial_backoff * multiplier^n`, capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct RetryConfig {
    /// Total number of attempts per API call, including the first
    #[cfg_attr(
        feature = "config",
        arg(long = "retry-max-attempts", env = "GENIE_RETRY_MAX_ATTEMPTS", default_value = "5")
    )]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before the first retry in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(long = "retry-initial-backoff", env = "GENIE_RETRY_INITIAL_BACKOFF", default_value = "5000")
    )]
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum wait between retries in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(long = "retry-max-backoff", env = "GENIE_RETRY_MAX_BACKOFF", default_value = "120000")
    )]
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Growth factor between consecutive waits
    #[cfg_attr(
        feature = "config",
        arg(long = "retry-multiplier", env = "GENIE_RETRY_MULTIPLIER", default_value = "2.0")
    )]
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    5_000
}

fn default_max_backoff_ms() -> u64 {
    120_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Creates a configuration with the given attempt count and initial backoff.
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: duration_ms(initial_backoff),
            ..Self::default()
        }
    }

    /// Creates a configuration that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            multiplier: 1.0,
        }
    }

    /// Sets the maximum backoff.
    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff_ms = duration_ms(max_backoff);
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Returns the wait before the retry following failed attempt `attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let millis = self.initial_backoff_ms as f64 * self.multiplier.powi(exponent);
        let max = self.max_backoff_ms as f64;

        let capped = if millis.is_finite() { millis.min(max) } else { max };
        Duration::from_millis(capped as u64)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts.
    pub async fn retry<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            target: TRACING_TARGET,
                            attempt = attempt + 1,
                            "Request succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            attempt += 1;
            if !error.is_retryable() || attempt >= max_attempts {
                tracing::error!(
                    target: TRACING_TARGET,
                    attempt,
                    max_attempts,
                    error = %error,
                    "Request failed permanently"
                );
                return Err(error);
            }

            let backoff = self.backoff_for(attempt - 1);
            tracing::warn!(
                target: TRACING_TARGET,
                attempt,
                max_attempts,
                backoff_ms = backoff.as_millis(),
                error = %error,
                "Request failed, retrying"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use genie_core::{Error, ErrorKind};
    use tokio::time::Instant;

    use super::*;

    #[test]
    fn test_default_backoff_schedule() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_for(0), Duration::from_secs(5));
        assert_eq!(config.backoff_for(1), Duration::from_secs(10));
        assert_eq!(config.backoff_for(3), Duration::from_secs(40));
        assert_eq!(config.backoff_for(5), Duration::from_secs(120));
        assert_eq!(config.backoff_for(u32::MAX), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_retryable_errors() {
        let calls = AtomicU32::new(0);
        let started_at = Instant::now();

        let value = RetryConfig::default()
            .retry(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::service_unavailable())
                } else {
                    Ok("done")
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 5s then 10s of backoff.
        assert!(started_at.elapsed() >= Duration::from_secs(15));
        assert!(started_at.elapsed() < Duration::from_secs(16));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let error = RetryConfig::default()
            .retry(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::rate_limited())
            })
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::RateLimited);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_fail_immediately() {
        let calls = AtomicU32::new(0);

        let error = RetryConfig::default()
            .retry(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::authentication())
            })
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Authentication);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_makes_one_attempt() {
        let calls = AtomicU32::new(0);

        let _ = RetryConfig::no_retry()
            .retry(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::network_error())
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
