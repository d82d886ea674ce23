//! # Audit Logs
//!
//! Three append-only tables:
//!
//! - `order_creation_log` — every failed creation with inputs and partial
//!   ids; the recovery source for retry-queue reconciliation.
//! - `webhook_log` — one row per webhook delivery with the normalized
//!   status and outcome, whatever that outcome was.
//! - `notification_log` — send attempts per `(order, kind)`; the dedup
//!   guard reads successful rows from here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrderCreationLog {
    pub id: i64,
    pub session_key: Option<String>,
    pub inputs: serde_json::Value,
    pub error: String,
    pub quiz_id: Option<i64>,
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl OrderCreationLog {
    /// Record a failed creation. Returns the log id handed back to the
    /// client for support reference.
    pub async fn record(
        pool: &PgPool,
        session_key: Option<&str>,
        inputs: &serde_json::Value,
        error: &str,
        quiz_id: Option<i64>,
        order_id: Option<i64>,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO order_creation_log (session_key, inputs, error, quiz_id, order_id, \
             created_at) \
             VALUES ($1, $2, $3, $4, $5, now()) RETURNING id",
        )
        .bind(session_key)
        .bind(inputs)
        .bind(error)
        .bind(quiz_id)
        .bind(order_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WebhookLog {
    pub id: i64,
    pub transaction_id: Option<String>,
    pub raw_status: Option<String>,
    pub canonical_status: String,
    pub outcome: String,
    pub order_id: Option<i64>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WebhookLog {
    pub async fn record(
        pool: &PgPool,
        transaction_id: Option<&str>,
        raw_status: Option<&str>,
        canonical_status: &str,
        outcome: &str,
        order_id: Option<i64>,
        detail: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO webhook_log (transaction_id, raw_status, canonical_status, outcome, \
             order_id, detail, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, now()) RETURNING id",
        )
        .bind(transaction_id)
        .bind(raw_status)
        .bind(canonical_status)
        .bind(outcome)
        .bind(order_id)
        .bind(detail)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NotificationLog {
    pub id: i64,
    pub order_id: i64,
    pub kind: String,
    pub success: bool,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationLog {
    /// Dedup guard: has this `(order, kind)` pair already been delivered?
    pub async fn has_successful_send(
        pool: &PgPool,
        order_id: i64,
        kind: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notification_log \
             WHERE order_id = $1 AND kind = $2 AND success = TRUE",
        )
        .bind(order_id)
        .bind(kind)
        .fetch_one(pool)
        .await?;
        Ok(row.0 > 0)
    }

    /// Outcome is recorded success or failure, always.
    pub async fn record(
        pool: &PgPool,
        order_id: i64,
        kind: &str,
        success: bool,
        provider_message_id: Option<&str>,
        error: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO notification_log (order_id, kind, success, provider_message_id, error, \
             created_at) \
             VALUES ($1, $2, $3, $4, $5, now()) RETURNING id",
        )
        .bind(order_id)
        .bind(kind)
        .bind(success)
        .bind(provider_message_id)
        .bind(error)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
