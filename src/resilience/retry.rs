//! Bounded retry with exponential backoff.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempt/backoff policy for [`with_retry`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy for provider-facing calls: few attempts, quick backoff.
    pub fn upstream() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }

    /// More generous policy for storage writes hitting deadlocks or pool
    /// exhaustion.
    pub fn storage() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }

    /// Notification sends: attempt bound comes from configuration, backoff
    /// is generous because nobody is waiting on the response.
    pub fn notification(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Delay before the given attempt (1-based): `initial * multiplier^(n-1)`,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self
            .initial_delay
            .mul_f64(self.backoff_multiplier.powi(exponent));
        delay.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::upstream()
    }
}

/// Run `operation` up to `policy.max_attempts` times, sleeping the policy's
/// backoff between attempts. Errors that fail the predicate propagate
/// immediately without consuming further attempts.
pub async fn with_retry_if<T, F, Fut, P>(
    operation_name: &str,
    policy: &RetryPolicy,
    is_retryable: P,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&Error) -> bool,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt, "operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if !is_retryable(&err) => return Err(err),
            Err(err) if attempt >= policy.max_attempts => {
                warn!(
                    operation = operation_name,
                    attempts = attempt,
                    error = %err,
                    "retry budget exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for_attempt(attempt);
                debug!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// [`with_retry_if`] using the crate taxonomy's own retryability rules.
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    policy: &RetryPolicy,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry_if(operation_name, policy, Error::is_retryable, operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_series_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        // Capped
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(500));
    }

    #[test]
    fn notification_policy_honors_the_configured_bound() {
        assert_eq!(RetryPolicy::notification(2).max_attempts, 2);
        // A zero bound would mean never trying at all
        assert_eq!(RetryPolicy::notification(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test_op", &fast_policy(5), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(Error::UpstreamTransient("503".into()))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry("test_op", &fast_policy(5), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Validation("bad input".into()))
        })
        .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_exactly_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry("test_op", &fast_policy(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::StorageTransient("deadlock".into()))
        })
        .await;
        assert!(matches!(result, Err(Error::StorageTransient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn custom_predicate_overrides_default() {
        let calls = AtomicU32::new(0);
        // Treat everything as non-retryable
        let result: Result<()> =
            with_retry_if("test_op", &fast_policy(5), |_| false, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::UpstreamTransient("503".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
