//! # Resilience Combinators
//!
//! Bounded retry with exponential backoff and deadline wrapping, used by
//! every external call in the pipeline (lyrics generation, synthesis
//! submission, media download, notification send) and by storage writes on
//! their transient-error paths.
//!
//! One combinator, parameterized by policy and a retryable-error predicate,
//! instead of ad hoc retry loops scattered per call site.

pub mod retry;
pub mod timeout;

pub use retry::{with_retry, with_retry_if, RetryPolicy};
pub use timeout::with_timeout;
