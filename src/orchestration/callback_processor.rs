//! # Synthesis Callback Finalization
//!
//! The provider calls back when a task finishes. Context is resolved only
//! through the `generation_tasks` correlation index; the handler never
//! scans jobs for a matching id. Duplicate callbacks are absorbed: a job
//! already completed acknowledges without re-running the finalization, and
//! the song upsert is keyed on `job_id`.
//!
//! Provider result URLs expire, so the audio is re-hosted to owned storage
//! before the song exists as a deliverable.

use super::{notifications, PipelineContext};
use crate::error::{Error, Result};
use crate::models::{GenerationTask, Job, NewSong, Order, Song};
use crate::orchestration::notifications::NotificationKind;
use crate::resilience::{with_retry, with_timeout, RetryPolicy};
use crate::state_machine::JobStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackPayload {
    pub task_id: String,
    pub status: String,
    pub audio_url: Option<String>,
    pub artwork_url: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackOutcome {
    pub job_id: i64,
    pub song_id: Option<i64>,
    /// True when this delivery changed nothing (duplicate or late callback).
    pub duplicate: bool,
}

pub async fn process_callback(
    ctx: &Arc<PipelineContext>,
    payload: &CallbackPayload,
) -> Result<CallbackOutcome> {
    let task = GenerationTask::find_by_task_id(&ctx.pool, &payload.task_id)
        .await?
        .ok_or_else(|| {
            Error::not_found(format!("no synthesis task matches id {}", payload.task_id))
        })?;

    let job = Job::find_by_id(&ctx.pool, task.job_id)
        .await?
        .ok_or_else(|| {
            Error::state_inconsistency(format!(
                "synthesis task {} references missing job {}",
                task.task_id, task.job_id
            ))
        })?;

    let current = job
        .status
        .parse::<JobStatus>()
        .map_err(Error::state_inconsistency)?;
    if current == JobStatus::Completed {
        info!(job_id = job.id, task_id = %payload.task_id, "duplicate callback, already finalized");
        return Ok(CallbackOutcome {
            job_id: job.id,
            song_id: task.song_id,
            duplicate: true,
        });
    }

    if !payload.status.eq_ignore_ascii_case("completed") {
        let detail = payload
            .error
            .as_deref()
            .unwrap_or("synthesis failed without a provider message");
        // Stored verbatim: the provider's wording is the operator's clue.
        Job::mark_failed(&ctx.pool, job.id, detail).await?;
        warn!(job_id = job.id, task_id = %payload.task_id, error = detail, "synthesis failed");
        return Ok(CallbackOutcome {
            job_id: job.id,
            song_id: None,
            duplicate: false,
        });
    }

    let source_url = payload
        .audio_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| {
            Error::validation(format!(
                "completed callback for task {} carries no audio URL",
                payload.task_id
            ))
        })?;

    let key = format!("songs/{}/{}.mp3", task.order_id, task.job_id);
    let timeout = Duration::from_millis(ctx.config.synthesis.download_timeout_ms);
    let durable_url = with_retry("media_rehost", &RetryPolicy::upstream(), || async {
        with_timeout("media_rehost", timeout, ctx.media.rehost(source_url, &key)).await
    })
    .await?;

    let song = Song::upsert_ready(
        &ctx.pool,
        &NewSong {
            order_id: task.order_id,
            job_id: task.job_id,
            audio_url: durable_url,
            artwork_url: payload.artwork_url.clone(),
        },
    )
    .await?;
    GenerationTask::attach_song(&ctx.pool, task.id, song.id).await?;
    Job::mark_completed(&ctx.pool, job.id).await?;

    info!(
        job_id = job.id,
        song_id = song.id,
        task_id = %payload.task_id,
        "synthesis finalized"
    );

    if let Some(order) = Order::find_by_id(&ctx.pool, task.order_id).await? {
        let notify_ctx = Arc::clone(ctx);
        tokio::spawn(async move {
            let outcome =
                notifications::dispatch(&notify_ctx, &order, NotificationKind::SongReady).await;
            if let Some(error) = outcome.error {
                warn!(order_id = order.id, error, "song-ready notification failed");
            }
        });
    }

    Ok(CallbackOutcome {
        job_id: job.id,
        song_id: Some(song.id),
        duplicate: false,
    })
}
