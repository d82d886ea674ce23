//! # Crate Error Taxonomy
//!
//! Structured error handling for the fulfillment pipeline. Every component
//! returns [`Error`] so that retryability, HTTP mapping, and logging can be
//! decided in one place instead of per call site.
//!
//! The taxonomy mirrors how failures are handled, not where they originate:
//! transient upstream/storage failures are retried with backoff, validation
//! and authorization failures are surfaced immediately, configuration
//! failures are fatal and logged loudly at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or mismatched credential. Never retried.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate in-flight submission or a conditional write that lost its
    /// race. Never retried automatically.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Provider-side 429/5xx/connection failure. Retried with backoff.
    #[error("upstream transient error: {0}")]
    UpstreamTransient(String),

    /// Provider rejected the request outright (4xx other than 429).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Deadlock, pool exhaustion, statement timeout. Retried with the more
    /// generous storage policy.
    #[error("storage transient error: {0}")]
    StorageTransient(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// A deadline elapsed and the underlying call was cancelled. Retryable.
    #[error("operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Missing required credential or malformed configuration. Never
    /// retried; the process should not limp along without it.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Persisted state disagrees with what was just written. Fatal for the
    /// operation; an operator has to look at it.
    #[error("state inconsistency: {0}")]
    StateInconsistency(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a bounded-retry wrapper should re-attempt after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::UpstreamTransient(_) | Error::StorageTransient(_) | Error::Timeout { .. }
        )
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Error::Upstream(msg.into())
    }

    pub fn state_inconsistency(msg: impl Into<String>) -> Self {
        Error::StateInconsistency(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

/// Classify a database error into the retryable/terminal split at the
/// storage boundary, once, instead of ad hoc at each call site.
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Error::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Error::StorageTransient(err.to_string())
            }
            sqlx::Error::Io(_) => Error::StorageTransient(err.to_string()),
            sqlx::Error::Database(db) => {
                // 40001 serialization_failure, 40P01 deadlock_detected,
                // 53300 too_many_connections, 57014 query_canceled
                let transient = matches!(
                    db.code().as_deref(),
                    Some("40001") | Some("40P01") | Some("53300") | Some("57014")
                );
                if transient {
                    Error::StorageTransient(err.to_string())
                } else {
                    Error::Storage(err.to_string())
                }
            }
            _ => Error::Storage(err.to_string()),
        }
    }
}

/// Classify outbound HTTP failures: connection problems, timeouts, 429 and
/// 5xx retry; other statuses are the provider telling us no.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return Error::UpstreamTransient(err.to_string());
        }
        if let Some(status) = err.status() {
            if status.as_u16() == 429 || status.is_server_error() {
                return Error::UpstreamTransient(err.to_string());
            }
            return Error::Upstream(err.to_string());
        }
        Error::UpstreamTransient(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(format!("invalid JSON payload: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(Error::UpstreamTransient("503".into()).is_retryable());
        assert!(Error::StorageTransient("deadlock".into()).is_retryable());
        assert!(Error::Timeout {
            operation: "lyrics_generation".into(),
            timeout_ms: 30_000,
        }
        .is_retryable());
    }

    #[test]
    fn terminal_errors_are_not_retryable() {
        assert!(!Error::Validation("missing field".into()).is_retryable());
        assert!(!Error::Unauthorized("bad secret".into()).is_retryable());
        assert!(!Error::Conflict("duplicate submission".into()).is_retryable());
        assert!(!Error::Configuration("missing api key".into()).is_retryable());
        assert!(!Error::StateInconsistency("task id mismatch".into()).is_retryable());
    }

    #[test]
    fn sqlx_row_not_found_maps_to_not_found() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
