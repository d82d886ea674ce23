//! # GenerationTask Model
//!
//! Correlation record: external synthesis task id → owning job/order/song.
//! The callback handler resolves context only through this index, never by
//! scanning entity tables. `task_id` is unique.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GenerationTask {
    pub id: i64,
    pub task_id: String,
    pub job_id: i64,
    pub order_id: i64,
    pub song_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGenerationTask {
    pub task_id: String,
    pub job_id: i64,
    pub order_id: i64,
}

const TASK_COLUMNS: &str = "id, task_id, job_id, order_id, song_id, created_at";

impl GenerationTask {
    /// Idempotent on `task_id`: a re-submission with the same external id
    /// keeps the original correlation row.
    pub async fn create(
        pool: &PgPool,
        new_task: &NewGenerationTask,
    ) -> Result<GenerationTask, sqlx::Error> {
        let sql = format!(
            "INSERT INTO generation_tasks (task_id, job_id, order_id, created_at) \
             VALUES ($1, $2, $3, now()) \
             ON CONFLICT (task_id) DO UPDATE SET task_id = EXCLUDED.task_id \
             RETURNING {TASK_COLUMNS}"
        );
        sqlx::query_as::<_, GenerationTask>(&sql)
            .bind(&new_task.task_id)
            .bind(new_task.job_id)
            .bind(new_task.order_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_task_id(
        pool: &PgPool,
        task_id: &str,
    ) -> Result<Option<GenerationTask>, sqlx::Error> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM generation_tasks WHERE task_id = $1");
        sqlx::query_as::<_, GenerationTask>(&sql)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn attach_song(pool: &PgPool, id: i64, song_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE generation_tasks SET song_id = $2 WHERE id = $1")
            .bind(id)
            .bind(song_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
