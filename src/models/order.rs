//! # Order Model
//!
//! The billable unit: a customer's purchase and its payment state.
//!
//! ## Database Schema
//!
//! Maps to the `orders` table:
//! ```sql
//! CREATE TABLE orders (
//!   id BIGSERIAL PRIMARY KEY,
//!   session_key TEXT NOT NULL UNIQUE,
//!   status TEXT NOT NULL DEFAULT 'pending',
//!   quiz_id BIGINT REFERENCES quizzes(id),
//!   customer_email TEXT NOT NULL,
//!   customer_name TEXT,
//!   plan TEXT NOT NULL,
//!   amount_cents BIGINT NOT NULL,
//!   payment_provider TEXT,
//!   transaction_id TEXT,
//!   paid_at TIMESTAMPTZ,
//!   created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!   updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```
//!
//! ## Invariants
//!
//! - `status = 'paid'` implies `paid_at IS NOT NULL`; both are written in
//!   the same conditional statement.
//! - The pending→paid transition is monotonic. [`Order::mark_paid`] uses
//!   `WHERE status <> 'paid'`; zero rows affected means another delivery of
//!   the same webhook won the race and the caller reports "already paid".
//! - `paid_at` is cleared only by [`Order::unmark_paid`] and
//!   [`Order::refund`].
//! - The unique `session_key` makes order creation idempotent per checkout
//!   session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub session_key: String,
    pub status: String,
    pub quiz_id: Option<i64>,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub plan: String,
    pub amount_cents: i64,
    pub payment_provider: Option<String>,
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload (without generated fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub session_key: String,
    pub quiz_id: Option<i64>,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub plan: String,
    pub amount_cents: i64,
}

const ORDER_COLUMNS: &str = "id, session_key, status, quiz_id, customer_email, customer_name, \
     plan, amount_cents, payment_provider, transaction_id, paid_at, created_at, updated_at";

impl Order {
    /// Insert within a caller-owned transaction (order creation pairs this
    /// with the quiz insert).
    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        new_order: &NewOrder,
    ) -> Result<Order, sqlx::Error> {
        let sql = format!(
            "INSERT INTO orders (session_key, status, quiz_id, customer_email, customer_name, \
             plan, amount_cents, created_at, updated_at) \
             VALUES ($1, 'pending', $2, $3, $4, $5, $6, now(), now()) \
             RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(&new_order.session_key)
            .bind(new_order.quiz_id)
            .bind(&new_order.customer_email)
            .bind(&new_order.customer_name)
            .bind(&new_order.plan)
            .bind(new_order.amount_cents)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_session_key(
        pool: &PgPool,
        session_key: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE session_key = $1");
        sqlx::query_as::<_, Order>(&sql)
            .bind(session_key)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_transaction_id(
        pool: &PgPool,
        transaction_id: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE transaction_id = $1");
        sqlx::query_as::<_, Order>(&sql)
            .bind(transaction_id)
            .fetch_optional(pool)
            .await
    }

    /// Fallback resolution for webhook payloads that carry neither a usable
    /// reference id nor a known transaction id: the most recent pending
    /// order for the payer's email.
    pub async fn latest_pending_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE customer_email = $1 AND status = 'pending' \
             ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Atomic pending→paid transition. Returns `None` when the order was
    /// already paid (the race-closing `WHERE` clause matched no row).
    pub async fn mark_paid(
        pool: &PgPool,
        id: i64,
        payment_provider: Option<&str>,
        transaction_id: Option<&str>,
    ) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!(
            "UPDATE orders SET status = 'paid', paid_at = now(), \
             payment_provider = COALESCE($2, payment_provider), \
             transaction_id = COALESCE($3, transaction_id), \
             updated_at = now() \
             WHERE id = $1 AND status <> 'paid' \
             RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(payment_provider)
            .bind(transaction_id)
            .fetch_optional(pool)
            .await
    }

    /// Operator reversal of a paid marking. Clears `paid_at`.
    pub async fn unmark_paid(pool: &PgPool, id: i64) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!(
            "UPDATE orders SET status = 'pending', paid_at = NULL, updated_at = now() \
             WHERE id = $1 AND status = 'paid' \
             RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Refund bookkeeping. Clears `paid_at` per the order invariant.
    pub async fn refund(pool: &PgPool, id: i64) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!(
            "UPDATE orders SET status = 'refunded', paid_at = NULL, updated_at = now() \
             WHERE id = $1 AND status = 'paid' \
             RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn cancel(pool: &PgPool, id: i64) -> Result<Option<Order>, sqlx::Error> {
        let sql = format!(
            "UPDATE orders SET status = 'cancelled', updated_at = now() \
             WHERE id = $1 AND status IN ('pending', 'failed') \
             RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Attach the quiz created by retry-queue recovery to its order.
    pub async fn attach_quiz(pool: &PgPool, id: i64, quiz_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE orders SET quiz_id = $2, updated_at = now() WHERE id = $1 AND quiz_id IS NULL",
        )
        .bind(id)
        .bind(quiz_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove pending orders older than the given age. Returns the count,
    /// for the admin `cleanup_pending` action's report.
    pub async fn cleanup_pending(pool: &PgPool, older_than_hours: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM orders WHERE status = 'pending' \
             AND created_at < now() - ($1 * INTERVAL '1 hour')",
        )
        .bind(older_than_hours)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
