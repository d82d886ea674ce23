//! # RetryQueueItem Model
//!
//! Durable record of a side-effect write that failed its primary path,
//! awaiting scheduled re-attempt by the sweep in
//! [`orchestration::retry_queue`](crate::orchestration::retry_queue).
//!
//! Claiming is a conditional `pending → processing` update so overlapping
//! sweeps cannot double-process an item; a claim is a lease, reclaimed if a
//! crashed sweep leaves it stuck past the lease window.

use crate::state_machine::RetryItemStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RetryQueueItem {
    pub id: i64,
    /// Which recovery write this item represents (e.g. `quiz_create`).
    pub kind: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_retry_at: DateTime<Utc>,
    pub status: String,
    pub last_error: Option<String>,
    /// Backref set once recovery attaches the recreated record to an order.
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRetryQueueItem {
    pub kind: String,
    pub payload: serde_json::Value,
    pub max_attempts: i32,
    pub order_id: Option<i64>,
}

const ITEM_COLUMNS: &str = "id, kind, payload, attempts, max_attempts, next_retry_at, status, \
     last_error, order_id, created_at, updated_at";

impl RetryQueueItem {
    pub async fn enqueue(
        pool: &PgPool,
        new_item: &NewRetryQueueItem,
    ) -> Result<RetryQueueItem, sqlx::Error> {
        let sql = format!(
            "INSERT INTO retry_queue_items (kind, payload, attempts, max_attempts, \
             next_retry_at, status, order_id, created_at, updated_at) \
             VALUES ($1, $2, 0, $3, now(), 'pending', $4, now(), now()) \
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, RetryQueueItem>(&sql)
            .bind(&new_item.kind)
            .bind(&new_item.payload)
            .bind(new_item.max_attempts)
            .bind(new_item.order_id)
            .fetch_one(pool)
            .await
    }

    /// The sweep batch: due pending items, oldest deadline first.
    pub async fn due_batch(pool: &PgPool, limit: i64) -> Result<Vec<RetryQueueItem>, sqlx::Error> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM retry_queue_items \
             WHERE status = 'pending' AND next_retry_at <= now() \
             ORDER BY next_retry_at ASC LIMIT $1"
        );
        sqlx::query_as::<_, RetryQueueItem>(&sql)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Claim an item for this sweep. Zero rows affected means another sweep
    /// claimed it first.
    pub async fn claim(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE retry_queue_items SET status = 'processing', updated_at = now() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Return items stuck in `processing` past the lease window to
    /// `pending` (a crashed sweep never released them).
    pub async fn reclaim_stale(pool: &PgPool, lease_ms: u64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE retry_queue_items SET status = 'pending', updated_at = now() \
             WHERE status = 'processing' \
               AND updated_at < now() - ($1 * INTERVAL '1 millisecond')",
        )
        .bind(lease_ms as i64)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_completed(
        pool: &PgPool,
        id: i64,
        order_id: Option<i64>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE retry_queue_items SET status = 'completed', \
             order_id = COALESCE($2, order_id), updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(order_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Record a failed attempt with the caller-decided status: `pending`
    /// reschedules for the computed deadline, `failed` parks the item
    /// terminally.
    pub async fn record_failure(
        pool: &PgPool,
        id: i64,
        attempts: i32,
        status: RetryItemStatus,
        next_retry_at: DateTime<Utc>,
        error: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE retry_queue_items SET status = $2, attempts = $3, next_retry_at = $4, \
             last_error = $5, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .bind(attempts)
        .bind(next_retry_at)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
