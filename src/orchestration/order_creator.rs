//! # Atomic Order Creation
//!
//! Creates the Quiz+Order pair in a single transaction keyed by the
//! checkout session. Resubmitting the same session key returns the existing
//! ids instead of creating a duplicate. Every failure leaves a structured
//! row in `order_creation_log` — the recovery source for the retry queue —
//! before the error goes back to the caller.

use crate::error::{Error, Result};
use crate::models::{NewOrder, NewQuiz, Order, OrderCreationLog, Quiz};
use crate::models::{NewRetryQueueItem, RetryQueueItem};
use crate::resilience::{with_retry, RetryPolicy};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreationRequest {
    pub session_id: String,
    pub quiz: NewQuiz,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub plan: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderCreationResult {
    pub order_id: i64,
    pub quiz_id: i64,
    /// True when the session key matched an existing pair (idempotent
    /// resubmission).
    pub already_existed: bool,
}

/// Creation failure with the audit-log reference handed back to the client.
#[derive(Debug)]
pub struct CreationFailure {
    pub error: Error,
    pub log_id: Option<i64>,
}

/// Validate the brief: a recipient, a style, and exactly one of the two
/// message shapes — the structured `message` field or the legacy narrative
/// fields (`occasion`/`story`/`details`).
pub fn validate_brief(quiz: &NewQuiz) -> Result<()> {
    if quiz.recipient.trim().is_empty() {
        return Err(Error::validation("quiz is missing a recipient"));
    }
    if quiz.style.trim().is_empty() {
        return Err(Error::validation("quiz is missing a style"));
    }

    let has_message = quiz.message.as_deref().is_some_and(|m| !m.trim().is_empty());
    let has_legacy = [&quiz.occasion, &quiz.story, &quiz.details]
        .into_iter()
        .any(|f| f.as_deref().is_some_and(|v| !v.trim().is_empty()));

    match (has_message, has_legacy) {
        (true, false) | (false, true) => Ok(()),
        (true, true) => Err(Error::validation(
            "quiz must use either the message field or the narrative fields, not both",
        )),
        (false, false) => Err(Error::validation(
            "quiz must include a message or the narrative fields",
        )),
    }
}

/// Create the Quiz+Order pair. See module docs for the idempotency and
/// audit-trail contract.
pub async fn create_order(
    pool: &PgPool,
    request: &OrderCreationRequest,
) -> std::result::Result<OrderCreationResult, CreationFailure> {
    if let Err(err) = validate_brief(&request.quiz) {
        let log_id = record_failure(pool, request, &err).await;
        return Err(CreationFailure { error: err, log_id });
    }
    if request.customer_email.trim().is_empty() {
        let err = Error::validation("customer email is required");
        let log_id = record_failure(pool, request, &err).await;
        return Err(CreationFailure { error: err, log_id });
    }

    // Idempotency fast path: the session key already produced an order.
    match Order::find_by_session_key(pool, &request.session_id).await {
        Ok(Some(existing)) => {
            info!(
                order_id = existing.id,
                session_key = %request.session_id,
                "order creation replay, returning existing pair"
            );
            return Ok(OrderCreationResult {
                order_id: existing.id,
                quiz_id: existing.quiz_id.unwrap_or_default(),
                already_existed: true,
            });
        }
        Ok(None) => {}
        Err(err) => {
            let err: Error = err.into();
            let log_id = record_failure(pool, request, &err).await;
            return Err(CreationFailure { error: err, log_id });
        }
    }

    let insert = with_retry("order_creation", &RetryPolicy::storage(), || async {
        insert_pair(pool, request).await
    })
    .await;

    match insert {
        Ok(result) => Ok(result),
        Err(err) => {
            // A concurrent replay may have won the unique session key.
            if let Ok(Some(existing)) = Order::find_by_session_key(pool, &request.session_id).await
            {
                return Ok(OrderCreationResult {
                    order_id: existing.id,
                    quiz_id: existing.quiz_id.unwrap_or_default(),
                    already_existed: true,
                });
            }

            let log_id = record_failure(pool, request, &err).await;
            if matches!(err, Error::StorageTransient(_)) {
                enqueue_recovery(pool, request).await;
            }
            Err(CreationFailure { error: err, log_id })
        }
    }
}

async fn insert_pair(pool: &PgPool, request: &OrderCreationRequest) -> Result<OrderCreationResult> {
    let mut tx = pool.begin().await?;

    let quiz = Quiz::create_in_tx(&mut tx, &request.quiz).await?;
    let order = Order::create_in_tx(
        &mut tx,
        &NewOrder {
            session_key: request.session_id.clone(),
            quiz_id: Some(quiz.id),
            customer_email: request.customer_email.clone(),
            customer_name: request.customer_name.clone(),
            plan: request.plan.clone(),
            amount_cents: request.amount_cents,
        },
    )
    .await?;

    tx.commit().await?;

    info!(
        order_id = order.id,
        quiz_id = quiz.id,
        plan = %request.plan,
        "order created"
    );

    Ok(OrderCreationResult {
        order_id: order.id,
        quiz_id: quiz.id,
        already_existed: false,
    })
}

async fn record_failure(
    pool: &PgPool,
    request: &OrderCreationRequest,
    error: &Error,
) -> Option<i64> {
    let inputs = serde_json::to_value(request).unwrap_or(serde_json::Value::Null);
    match OrderCreationLog::record(
        pool,
        Some(&request.session_id),
        &inputs,
        &error.to_string(),
        None,
        None,
    )
    .await
    {
        Ok(log_id) => Some(log_id),
        Err(log_err) => {
            // The audit write itself failed; nothing left but the log stream.
            warn!(error = %log_err, original = %error, "order creation audit write failed");
            None
        }
    }
}

async fn enqueue_recovery(pool: &PgPool, request: &OrderCreationRequest) {
    let payload = serde_json::json!({
        "quiz": request.quiz,
        "session_key": request.session_id,
    });
    let item = NewRetryQueueItem {
        kind: retry_kind::QUIZ_CREATE.to_string(),
        payload,
        max_attempts: 5,
        order_id: None,
    };
    if let Err(err) = RetryQueueItem::enqueue(pool, &item).await {
        warn!(error = %err, "failed to enqueue quiz recovery item");
    }
}

/// Retry-queue item kinds produced by this module.
pub mod retry_kind {
    pub const QUIZ_CREATE: &str = "quiz_create";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(message: Option<&str>, story: Option<&str>) -> NewQuiz {
        NewQuiz {
            recipient: "Maria".into(),
            style: "ballad".into(),
            tone: None,
            message: message.map(Into::into),
            occasion: None,
            story: story.map(Into::into),
            details: None,
            voice_preference: None,
        }
    }

    #[test]
    fn structured_message_alone_is_valid() {
        assert!(validate_brief(&quiz(Some("happy birthday"), None)).is_ok());
    }

    #[test]
    fn legacy_fields_alone_are_valid() {
        assert!(validate_brief(&quiz(None, Some("we met in Lisbon"))).is_ok());
    }

    #[test]
    fn both_patterns_together_are_rejected() {
        let err = validate_brief(&quiz(Some("hi"), Some("story"))).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn neither_pattern_is_rejected() {
        assert!(validate_brief(&quiz(None, None)).is_err());
    }

    #[test]
    fn blank_recipient_is_rejected() {
        let mut q = quiz(Some("hi"), None);
        q.recipient = "  ".into();
        assert!(validate_brief(&q).is_err());
    }
}
