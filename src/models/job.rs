//! # Job Model
//!
//! One generation lifecycle for an order: lyrics production, then audio
//! synthesis. The external `synthesis_task_id` is immutable once set —
//! [`Job::assign_task_id`] only writes into a NULL column, which is what
//! makes the duplicate-submission guard safe against concurrent dispatchers.
//!
//! Maps to the `jobs` table: id, order_id, status TEXT, lyrics TEXT,
//! sections JSONB, synthesis_task_id TEXT, last_error TEXT, timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: i64,
    pub order_id: i64,
    pub status: String,
    pub lyrics: Option<String>,
    pub sections: Option<serde_json::Value>,
    pub synthesis_task_id: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub order_id: i64,
}

const JOB_COLUMNS: &str =
    "id, order_id, status, lyrics, sections, synthesis_task_id, last_error, created_at, updated_at";

impl Job {
    pub async fn create(pool: &PgPool, new_job: &NewJob) -> Result<Job, sqlx::Error> {
        let sql = format!(
            "INSERT INTO jobs (order_id, status, created_at, updated_at) \
             VALUES ($1, 'pending', now(), now()) \
             RETURNING {JOB_COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&sql)
            .bind(new_job.order_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Job>, sqlx::Error> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_order(pool: &PgPool, order_id: i64) -> Result<Vec<Job>, sqlx::Error> {
        let sql =
            format!("SELECT {JOB_COLUMNS} FROM jobs WHERE order_id = $1 ORDER BY created_at DESC");
        sqlx::query_as::<_, Job>(&sql)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    /// The duplicate-in-flight query: any job on this order already holding
    /// an external task id in a synthesis state. Checked immediately before
    /// submission; the NULL-only write in [`Job::assign_task_id`] closes the
    /// remaining race at the storage layer.
    pub async fn find_in_flight_sibling(
        pool: &PgPool,
        order_id: i64,
    ) -> Result<Option<Job>, sqlx::Error> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs \
             WHERE order_id = $1 \
               AND status IN ('generating_audio', 'audio_processing') \
               AND synthesis_task_id IS NOT NULL \
             LIMIT 1"
        );
        sqlx::query_as::<_, Job>(&sql)
            .bind(order_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status(pool: &PgPool, id: i64, status: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE jobs SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_lyrics(
        pool: &PgPool,
        id: i64,
        lyrics: &str,
        sections: &serde_json::Value,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET lyrics = $2, sections = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(lyrics)
        .bind(sections)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Write the external task id only if none is present. Zero rows
    /// affected means a concurrent submission already claimed this job.
    pub async fn assign_task_id(
        pool: &PgPool,
        id: i64,
        task_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET synthesis_task_id = $2, status = 'generating_audio', \
             updated_at = now() \
             WHERE id = $1 AND synthesis_task_id IS NULL",
        )
        .bind(id)
        .bind(task_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_completed(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'completed', last_error = NULL, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Provider error message recorded verbatim for operator diagnosis.
    pub async fn mark_failed(pool: &PgPool, id: i64, error: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', last_error = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
