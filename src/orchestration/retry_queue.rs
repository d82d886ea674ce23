//! # Durable Retry Sweep
//!
//! Periodic recovery of side-effect writes that failed their primary path.
//! Each sweep reclaims stale leases, claims a batch of due items, executes
//! each by kind with a small number of immediate attempts, and either
//! completes the item or reschedules it with exponential backoff until the
//! attempt cap parks it as terminally failed.
//!
//! The sweep is safe to run from multiple processes: claiming is a
//! conditional `pending → processing` update, so overlap costs only a
//! skipped item.

use super::order_creator::retry_kind;
use super::PipelineContext;
use crate::error::{Error, Result};
use crate::models::{NewQuiz, Order, Quiz, RetryQueueItem};
use crate::state_machine::RetryItemStatus;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

/// Immediate in-sweep attempts per item before it goes back to the queue.
const LOCAL_ATTEMPTS: u32 = 3;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    pub reclaimed: u64,
    pub claimed: u64,
    pub completed: u64,
    pub rescheduled: u64,
    pub failed_terminally: u64,
}

/// Queue status after a failed execution: parked terminally at the attempt
/// cap, otherwise back to `pending` for the next due sweep.
pub fn failure_status(attempts: i32, max_attempts: i32) -> RetryItemStatus {
    if attempts >= max_attempts {
        RetryItemStatus::Failed
    } else {
        RetryItemStatus::Pending
    }
}

/// The scheduled deadline after `attempts` failed tries (1-based):
/// `base * 2^(attempts-1)`, capped.
pub fn backoff_deadline(attempts: i32, base_ms: u64, cap_ms: u64) -> DateTime<Utc> {
    let exponent = attempts.saturating_sub(1).min(31) as u32;
    let delay_ms = base_ms.saturating_mul(1u64 << exponent).min(cap_ms);
    Utc::now() + ChronoDuration::milliseconds(delay_ms as i64)
}

/// One full sweep. Errors from individual items never abort the batch.
pub async fn sweep(ctx: &PipelineContext) -> Result<SweepStats> {
    let mut stats = SweepStats::default();
    let queue = &ctx.config.retry_queue;

    stats.reclaimed = RetryQueueItem::reclaim_stale(&ctx.pool, queue.processing_lease_ms).await?;
    if stats.reclaimed > 0 {
        warn!(reclaimed = stats.reclaimed, "reclaimed stale retry leases");
    }

    let batch = RetryQueueItem::due_batch(&ctx.pool, queue.batch_size).await?;
    for item in batch {
        if !RetryQueueItem::claim(&ctx.pool, item.id).await? {
            continue;
        }
        stats.claimed += 1;

        match execute_item(ctx, &item).await {
            Ok(order_id) => {
                RetryQueueItem::mark_completed(&ctx.pool, item.id, order_id).await?;
                stats.completed += 1;
                info!(item_id = item.id, kind = %item.kind, "retry item recovered");
            }
            Err(err) => {
                let attempts = item.attempts + 1;
                let status = failure_status(attempts, item.max_attempts);
                let deadline =
                    backoff_deadline(attempts, queue.backoff_base_ms, queue.backoff_cap_ms);
                RetryQueueItem::record_failure(
                    &ctx.pool,
                    item.id,
                    attempts,
                    status,
                    deadline,
                    &err.to_string(),
                )
                .await?;
                if status.is_terminal() {
                    stats.failed_terminally += 1;
                    error!(
                        item_id = item.id,
                        kind = %item.kind,
                        attempts,
                        error = %err,
                        "retry item failed terminally"
                    );
                } else {
                    stats.rescheduled += 1;
                    warn!(
                        item_id = item.id,
                        kind = %item.kind,
                        attempts,
                        error = %err,
                        "retry item rescheduled"
                    );
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(queue.inter_item_delay_ms)).await;
    }

    Ok(stats)
}

/// Run sweeps forever on the configured interval. Spawned once from the
/// server binary; a failed sweep is logged and the loop keeps its cadence.
pub async fn run_sweeper(ctx: PipelineContext) {
    let mut interval =
        tokio::time::interval(Duration::from_millis(ctx.config.retry_queue.sweep_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        match sweep(&ctx).await {
            Ok(stats) if stats.claimed > 0 => {
                info!(
                    claimed = stats.claimed,
                    completed = stats.completed,
                    rescheduled = stats.rescheduled,
                    failed = stats.failed_terminally,
                    "retry sweep finished"
                );
            }
            Ok(_) => {}
            Err(err) => error!(error = %err, "retry sweep failed"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuizRecoveryPayload {
    quiz: NewQuiz,
    session_key: Option<String>,
}

/// Execute one claimed item by kind, with a few immediate attempts for
/// transient failures. Returns the order id to stamp on completion, if the
/// recovery attached anything.
async fn execute_item(ctx: &PipelineContext, item: &RetryQueueItem) -> Result<Option<i64>> {
    let mut last_err: Option<Error> = None;
    for _ in 0..LOCAL_ATTEMPTS {
        match execute_once(ctx, item).await {
            Ok(order_id) => return Ok(order_id),
            Err(err) if err.is_retryable() => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or_else(|| Error::internal("retry item produced no error")))
}

async fn execute_once(ctx: &PipelineContext, item: &RetryQueueItem) -> Result<Option<i64>> {
    match item.kind.as_str() {
        retry_kind::QUIZ_CREATE => {
            let payload: QuizRecoveryPayload = serde_json::from_value(item.payload.clone())?;
            let quiz = Quiz::create(&ctx.pool, &payload.quiz).await?;

            // If the order made it in before the quiz write failed, attach
            // the recreated quiz to it.
            if let Some(session_key) = payload.session_key.as_deref() {
                if let Some(order) = Order::find_by_session_key(&ctx.pool, session_key).await? {
                    if order.quiz_id.is_none() {
                        Order::attach_quiz(&ctx.pool, order.id, quiz.id).await?;
                    }
                    return Ok(Some(order.id));
                }
            }
            Ok(item.order_id)
        }
        other => Err(Error::validation(format!(
            "unknown retry item kind: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = 60_000;
        let cap = 3_600_000;
        let now = Utc::now();

        let first = backoff_deadline(1, base, cap) - now;
        let second = backoff_deadline(2, base, cap) - now;
        let third = backoff_deadline(3, base, cap) - now;

        // Allow slack for the Utc::now() calls inside.
        assert!((first.num_milliseconds() - 60_000).abs() < 1_000);
        assert!((second.num_milliseconds() - 120_000).abs() < 1_000);
        assert!((third.num_milliseconds() - 240_000).abs() < 1_000);
    }

    #[test]
    fn backoff_caps_at_configured_maximum() {
        let now = Utc::now();
        let capped = backoff_deadline(20, 60_000, 3_600_000) - now;
        assert!((capped.num_milliseconds() - 3_600_000).abs() < 1_000);
    }

    #[test]
    fn huge_attempt_counts_do_not_overflow() {
        let deadline = backoff_deadline(i32::MAX, 60_000, 3_600_000);
        assert!(deadline > Utc::now());
    }

    #[test]
    fn attempt_cap_parks_the_item_terminally() {
        assert_eq!(failure_status(3, 3), RetryItemStatus::Failed);
        assert_eq!(failure_status(5, 3), RetryItemStatus::Failed);
        assert!(failure_status(3, 3).is_terminal());
    }

    #[test]
    fn below_the_cap_the_item_returns_to_pending() {
        assert_eq!(failure_status(1, 3), RetryItemStatus::Pending);
        assert_eq!(failure_status(2, 3), RetryItemStatus::Pending);
    }
}
