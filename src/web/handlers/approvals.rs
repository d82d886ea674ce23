//! Internal lyrics-review endpoints.
//!
//! Approval is the trigger for synthesis dispatch; rejection bumps the
//! regeneration counter and reruns the generation loop on the same job.
//! Both are service-to-service calls guarded by the internal secret.

use super::admin::authorize_internal;
use crate::models::{Job, LyricsApproval, Order};
use crate::orchestration::{lyrics_orchestrator, synthesis_dispatcher};
use crate::state_machine::ApprovalStatus;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApprovalActionResponse {
    pub approval_id: i64,
    pub status: ApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// The response echoes what storage persisted, parsed through the status
/// enum rather than restating a literal.
fn persisted_status(approval: &LyricsApproval) -> ApiResult<ApprovalStatus> {
    approval.status.parse().map_err(|_| ApiError::Internal)
}

/// `POST /internal/approvals/:id/approve`.
pub async fn approve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(approval_id): Path<i64>,
    Json(request): Json<ApproveRequest>,
) -> ApiResult<Json<ApprovalActionResponse>> {
    authorize_internal(&state, &headers)?;

    let approval = LyricsApproval::approve(&state.ctx.pool, approval_id, request.voice.as_deref())
        .await?
        .ok_or_else(|| {
            ApiError::Conflict(format!("approval {approval_id} is not pending"))
        })?;

    let order = Order::find_by_id(&state.ctx.pool, approval.order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {}", approval.order_id)))?;
    let job = Job::find_by_id(&state.ctx.pool, approval.job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("job {}", approval.job_id)))?;

    let dispatched = synthesis_dispatcher::dispatch(
        &state.ctx,
        &order,
        &job,
        approval.voice_override.as_deref(),
    )
    .await?;

    info!(
        approval_id,
        order_id = order.id,
        task_id = %dispatched.task_id,
        "lyrics approved and dispatched for synthesis"
    );
    Ok(Json(ApprovalActionResponse {
        approval_id,
        status: persisted_status(&approval)?,
        task_id: Some(dispatched.task_id),
    }))
}

/// `POST /internal/approvals/:id/reject`. Responds once regeneration has
/// been kicked off in the background; the new lyrics arrive through a fresh
/// approval.
pub async fn reject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(approval_id): Path<i64>,
) -> ApiResult<Json<ApprovalActionResponse>> {
    authorize_internal(&state, &headers)?;

    let approval = LyricsApproval::reject(&state.ctx.pool, approval_id)
        .await?
        .ok_or_else(|| {
            ApiError::Conflict(format!("approval {approval_id} is not pending"))
        })?;
    LyricsApproval::increment_regeneration(&state.ctx.pool, approval.id).await?;

    let order = Order::find_by_id(&state.ctx.pool, approval.order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {}", approval.order_id)))?;
    let job = Job::find_by_id(&state.ctx.pool, approval.job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("job {}", approval.job_id)))?;

    let ctx = state.ctx.clone();
    tokio::spawn(async move {
        if let Err(err) = lyrics_orchestrator::run_generation(&ctx, &order, &job).await {
            tracing::warn!(
                order_id = order.id,
                job_id = job.id,
                error = %err,
                "regeneration after rejection failed"
            );
        }
    });

    Ok(Json(ApprovalActionResponse {
        approval_id,
        status: persisted_status(&approval)?,
        task_id: None,
    }))
}
