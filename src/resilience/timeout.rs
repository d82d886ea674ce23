//! Deadline wrapping for external calls.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Race `operation` against a deadline. On expiry the future is dropped —
/// which cancels the underlying call, not merely stops waiting for it — and
/// the caller gets [`Error::Timeout`], which classifies as retryable.
pub async fn with_timeout<T, Fut>(
    operation_name: &str,
    duration: Duration,
    operation: Fut,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation: operation_name.to_string(),
            timeout_ms: duration.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_deadline() {
        let result = with_timeout("fast_op", Duration::from_secs(1), async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn deadline_elapses_to_timeout_error() {
        let result: Result<()> = with_timeout("slow_op", Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        match result {
            Err(Error::Timeout {
                operation,
                timeout_ms,
            }) => {
                assert_eq!(operation, "slow_op");
                assert_eq!(timeout_ms, 5);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_error_is_retryable() {
        let result: Result<()> = with_timeout("slow_op", Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(result.unwrap_err().is_retryable());
    }
}
