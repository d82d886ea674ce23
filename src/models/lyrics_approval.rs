//! # LyricsApproval Model
//!
//! Review gate for generated lyrics. At most one `pending` approval exists
//! per order: [`LyricsApproval::open`] supersedes any prior pending row in
//! the same statement batch before inserting the new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LyricsApproval {
    pub id: i64,
    pub order_id: i64,
    pub job_id: i64,
    pub status: String,
    pub regeneration_count: i32,
    pub expires_at: DateTime<Utc>,
    pub voice_override: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLyricsApproval {
    pub order_id: i64,
    pub job_id: i64,
    pub expires_at: DateTime<Utc>,
}

const APPROVAL_COLUMNS: &str = "id, order_id, job_id, status, regeneration_count, expires_at, \
     voice_override, created_at, updated_at";

impl LyricsApproval {
    /// Open a fresh pending approval, rejecting any prior pending one for
    /// the order first so the one-pending-per-order invariant holds.
    pub async fn open(
        pool: &PgPool,
        new_approval: &NewLyricsApproval,
    ) -> Result<LyricsApproval, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE lyrics_approvals SET status = 'rejected', updated_at = now() \
             WHERE order_id = $1 AND status = 'pending'",
        )
        .bind(new_approval.order_id)
        .execute(&mut *tx)
        .await?;

        let sql = format!(
            "INSERT INTO lyrics_approvals (order_id, job_id, status, regeneration_count, \
             expires_at, created_at, updated_at) \
             VALUES ($1, $2, 'pending', 0, $3, now(), now()) \
             RETURNING {APPROVAL_COLUMNS}"
        );
        let approval = sqlx::query_as::<_, LyricsApproval>(&sql)
            .bind(new_approval.order_id)
            .bind(new_approval.job_id)
            .bind(new_approval.expires_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(approval)
    }

    pub async fn find_pending_by_order(
        pool: &PgPool,
        order_id: i64,
    ) -> Result<Option<LyricsApproval>, sqlx::Error> {
        let sql = format!(
            "SELECT {APPROVAL_COLUMNS} FROM lyrics_approvals \
             WHERE order_id = $1 AND status = 'pending' LIMIT 1"
        );
        sqlx::query_as::<_, LyricsApproval>(&sql)
            .bind(order_id)
            .fetch_optional(pool)
            .await
    }

    /// Operator approval, optionally fixing a voice override that will take
    /// precedence over the brief's preference at synthesis dispatch.
    pub async fn approve(
        pool: &PgPool,
        id: i64,
        voice_override: Option<&str>,
    ) -> Result<Option<LyricsApproval>, sqlx::Error> {
        let sql = format!(
            "UPDATE lyrics_approvals SET status = 'approved', voice_override = $2, \
             updated_at = now() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {APPROVAL_COLUMNS}"
        );
        sqlx::query_as::<_, LyricsApproval>(&sql)
            .bind(id)
            .bind(voice_override)
            .fetch_optional(pool)
            .await
    }

    pub async fn reject(pool: &PgPool, id: i64) -> Result<Option<LyricsApproval>, sqlx::Error> {
        let sql = format!(
            "UPDATE lyrics_approvals SET status = 'rejected', updated_at = now() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {APPROVAL_COLUMNS}"
        );
        sqlx::query_as::<_, LyricsApproval>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn increment_regeneration(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE lyrics_approvals SET regeneration_count = regeneration_count + 1, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
