//! # Song Model
//!
//! The deliverable artifact. Created when a synthesis callback is
//! finalized; `released` requires a non-empty audio URL, enforced by the
//! conditional in [`Song::release`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Song {
    pub id: i64,
    pub order_id: i64,
    pub job_id: i64,
    pub status: String,
    pub audio_url: Option<String>,
    pub artwork_url: Option<String>,
    pub released_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSong {
    pub order_id: i64,
    pub job_id: i64,
    pub audio_url: String,
    pub artwork_url: Option<String>,
}

const SONG_COLUMNS: &str =
    "id, order_id, job_id, status, audio_url, artwork_url, released_at, created_at, updated_at";

impl Song {
    /// Create or refresh the song for a finalized synthesis result. Keyed
    /// on `job_id` so a duplicate callback updates in place instead of
    /// producing a second deliverable.
    pub async fn upsert_ready(pool: &PgPool, new_song: &NewSong) -> Result<Song, sqlx::Error> {
        let sql = format!(
            "INSERT INTO songs (order_id, job_id, status, audio_url, artwork_url, \
             created_at, updated_at) \
             VALUES ($1, $2, 'ready', $3, $4, now(), now()) \
             ON CONFLICT (job_id) DO UPDATE SET \
               audio_url = EXCLUDED.audio_url, \
               artwork_url = EXCLUDED.artwork_url, \
               updated_at = now() \
             RETURNING {SONG_COLUMNS}"
        );
        sqlx::query_as::<_, Song>(&sql)
            .bind(new_song.order_id)
            .bind(new_song.job_id)
            .bind(&new_song.audio_url)
            .bind(&new_song.artwork_url)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Song>, sqlx::Error> {
        let sql = format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = $1");
        sqlx::query_as::<_, Song>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_order(pool: &PgPool, order_id: i64) -> Result<Option<Song>, sqlx::Error> {
        let sql = format!(
            "SELECT {SONG_COLUMNS} FROM songs WHERE order_id = $1 ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, Song>(&sql)
            .bind(order_id)
            .fetch_optional(pool)
            .await
    }

    /// Release the song now. The `audio_url IS NOT NULL` condition keeps the
    /// released⇒media invariant at the storage layer; `None` back means the
    /// song was not in a releasable state.
    pub async fn release(pool: &PgPool, id: i64) -> Result<Option<Song>, sqlx::Error> {
        let sql = format!(
            "UPDATE songs SET status = 'released', released_at = now(), updated_at = now() \
             WHERE id = $1 AND status IN ('ready', 'approved') AND audio_url IS NOT NULL \
             RETURNING {SONG_COLUMNS}"
        );
        sqlx::query_as::<_, Song>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
