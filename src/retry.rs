// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Connection Retry
 * Exponential backoff with jitter for opening DDP connections
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use crate::errors::DdpResult;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff schedule for connection attempts
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, the first one included (at least 1)
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Fraction of the backoff randomized, 0.0 disables jitter
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.3,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }

    /// Delay before attempt `attempt + 1`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped = base.min(self.max_backoff.as_millis() as f64);

        let millis = if self.jitter_factor > 0.0 && capped > 0.0 {
            let range = capped * self.jitter_factor;
            (capped + rand::rng().random_range(-range..range)).max(0.0)
        } else {
            capped
        };

        Duration::from_millis(millis as u64)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error,
/// or the attempts run out. The last error is returned.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> DdpResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DdpResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, operation = operation_name, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let retryable = err.is_retryable();
        warn!(
            attempt,
            max_attempts,
            operation = operation_name,
            error = %err,
            retryable,
            "Attempt failed"
        );

        if !retryable || attempt >= max_attempts {
            return Err(err);
        }

        let backoff = config.calculate_backoff(attempt);
        debug!(backoff_ms = backoff.as_millis() as u64, "Backing off");
        tokio::time::sleep(backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DdpError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick() -> RetryConfig {
        RetryConfig::default()
            .with_initial_backoff(Duration::from_millis(1))
            .without_jitter()
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        };

        assert_eq!(config.calculate_backoff(0), Duration::ZERO);
        assert_eq!(config.calculate_backoff(1), Duration::from_secs(1));
        assert_eq!(config.calculate_backoff(2), Duration::from_secs(2));
        assert_eq!(config.calculate_backoff(3), Duration::from_secs(4));
        assert_eq!(config.calculate_backoff(4), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_transport_failures_are_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&counter);

        let result = retry_with_backoff(&quick(), "open", || {
            let counter = Arc::clone(&seen);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DdpError::transport("ws://x", "refused"))
                } else {
                    Ok("ready")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ready");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_login_rejection_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&counter);

        let result: DdpResult<()> = retry_with_backoff(&quick().with_max_attempts(5), "open", || {
            let counter = Arc::clone(&seen);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DdpError::LoginRejected {
                    reason: "Incorrect password".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(DdpError::LoginRejected { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&counter);
        let result: DdpResult<()> = retry_with_backoff(&quick().with_max_attempts(0), "open", || {
            let counter = Arc::clone(&seen);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DdpError::transport("ws://x", "refused"))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
