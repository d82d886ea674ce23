//! # Synthesis Dispatch
//!
//! Submits approved lyrics to the audio-synthesis provider. The provider
//! bills per submission and offers no server-side dedup, so the guard here
//! is layered: a pre-submission in-flight check, the NULL-only task-id
//! write in [`Job::assign_task_id`], and a read-back that confirms the
//! persisted id matches what the provider returned.

use super::PipelineContext;
use crate::clients::SynthesisRequest;
use crate::error::{Error, Result};
use crate::models::{GenerationTask, Job, NewGenerationTask, Order, Quiz};
use crate::resilience::{with_retry, with_timeout, RetryPolicy};
use crate::state_machine::JobStatus;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub job_id: i64,
    pub task_id: String,
}

/// Voice precedence: a non-empty operator override beats the brief's
/// preference; empty or `"default"` means no opinion at that level.
pub fn effective_voice(operator_override: Option<&str>, brief_preference: Option<&str>) -> Option<String> {
    let meaningful = |v: &&str| {
        let trimmed = v.trim();
        !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("default")
    };
    operator_override
        .filter(meaningful)
        .or(brief_preference.filter(meaningful))
        .map(|v| v.trim().to_string())
}

/// First guard layer, pure over the loaded row: a job already in flight,
/// terminal, or holding a task id never reaches the provider again.
fn check_dispatchable(job: &Job) -> Result<()> {
    let current = job
        .status
        .parse::<JobStatus>()
        .map_err(Error::state_inconsistency)?;
    if current.is_synthesis_in_flight() || current.is_terminal() || job.synthesis_task_id.is_some()
    {
        return Err(Error::conflict(format!(
            "job {} is not dispatchable from status '{}'",
            job.id, job.status
        )));
    }
    Ok(())
}

/// Submit one job for synthesis. `voice_override` comes from the approval
/// record when an operator fixed a voice at review time.
pub async fn dispatch(
    ctx: &PipelineContext,
    order: &Order,
    job: &Job,
    voice_override: Option<&str>,
) -> Result<DispatchResult> {
    let lyrics = job
        .lyrics
        .as_deref()
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| Error::validation("job has no lyrics to synthesize"))?;

    check_dispatchable(job)?;

    // The sibling guard: another job on this order already holds a live
    // submission.
    if let Some(sibling) = Job::find_in_flight_sibling(&ctx.pool, order.id).await? {
        return Err(Error::conflict(format!(
            "order {} already has synthesis in flight on job {}",
            order.id, sibling.id
        )));
    }

    let quiz = match order.quiz_id {
        Some(quiz_id) => Quiz::find_by_id(&ctx.pool, quiz_id).await?,
        None => None,
    };
    let voice = effective_voice(
        voice_override,
        quiz.as_ref().and_then(|q| q.voice_preference.as_deref()),
    );

    let request = SynthesisRequest {
        lyrics: lyrics.to_string(),
        style: quiz.map(|q| q.style).unwrap_or_default(),
        voice,
        callback_url: ctx.config.synthesis.callback_url.clone(),
    };

    let timeout = Duration::from_millis(ctx.config.synthesis.request_timeout_ms);
    let task_id = with_retry("synthesis_submit", &RetryPolicy::upstream(), || async {
        with_timeout("synthesis_submit", timeout, ctx.synthesis.submit(&request)).await
    })
    .await?;

    // Guard 2: the NULL-only conditional write. Zero rows means a concurrent
    // dispatcher won; its task id stands and this submission is abandoned.
    let claimed = Job::assign_task_id(&ctx.pool, job.id, &task_id).await?;
    if claimed == 0 {
        warn!(
            job_id = job.id,
            task_id, "job claimed by a concurrent submission, abandoning ours"
        );
        return Err(Error::conflict(format!(
            "job {} was claimed by a concurrent synthesis submission",
            job.id
        )));
    }

    GenerationTask::create(
        &ctx.pool,
        &NewGenerationTask {
            task_id: task_id.clone(),
            job_id: job.id,
            order_id: order.id,
        },
    )
    .await?;

    // Guard 3: read-after-write. A mismatch here means storage and provider
    // disagree about which task owns this job.
    let persisted = Job::find_by_id(&ctx.pool, job.id)
        .await?
        .ok_or_else(|| Error::state_inconsistency(format!("job {} vanished after dispatch", job.id)))?;
    if persisted.synthesis_task_id.as_deref() != Some(task_id.as_str()) {
        return Err(Error::state_inconsistency(format!(
            "job {} persisted task id {:?} does not match submitted {}",
            job.id, persisted.synthesis_task_id, task_id
        )));
    }

    Job::set_status(&ctx.pool, job.id, "audio_processing").await?;

    info!(order_id = order.id, job_id = job.id, task_id, "synthesis dispatched");
    Ok(DispatchResult {
        job_id: job.id,
        task_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job_with(status: &str, task_id: Option<&str>) -> Job {
        Job {
            id: 7,
            order_id: 3,
            status: status.to_string(),
            lyrics: Some("[Intro]\nsome lyrics".to_string()),
            sections: None,
            synthesis_task_id: task_id.map(str::to_string),
            last_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn job_awaiting_dispatch_passes_the_guard() {
        assert!(check_dispatchable(&job_with("processing", None)).is_ok());
    }

    #[test]
    fn in_flight_job_is_never_resubmitted() {
        assert!(matches!(
            check_dispatchable(&job_with("generating_audio", Some("task-1"))),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            check_dispatchable(&job_with("audio_processing", Some("task-1"))),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn terminal_job_is_never_resubmitted() {
        assert!(matches!(
            check_dispatchable(&job_with("completed", None)),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            check_dispatchable(&job_with("failed", None)),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn assigned_task_id_blocks_dispatch_regardless_of_status() {
        assert!(matches!(
            check_dispatchable(&job_with("processing", Some("task-1"))),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn operator_override_beats_brief_preference() {
        assert_eq!(
            effective_voice(Some("tenor"), Some("alto")),
            Some("tenor".to_string())
        );
    }

    #[test]
    fn brief_preference_used_when_no_override() {
        assert_eq!(effective_voice(None, Some("alto")), Some("alto".to_string()));
    }

    #[test]
    fn empty_and_default_mean_no_opinion() {
        assert_eq!(effective_voice(Some(""), Some("alto")), Some("alto".to_string()));
        assert_eq!(effective_voice(Some("default"), Some("alto")), Some("alto".to_string()));
        assert_eq!(effective_voice(Some("  "), None), None);
        assert_eq!(effective_voice(None, Some("Default")), None);
        assert_eq!(effective_voice(None, None), None);
    }

    #[test]
    fn whitespace_is_trimmed_from_the_winner() {
        assert_eq!(
            effective_voice(Some(" tenor "), None),
            Some("tenor".to_string())
        );
    }
}
