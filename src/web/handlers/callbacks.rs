//! Synthesis provider callback endpoint.
//!
//! Acknowledges fast and idempotently: a duplicate callback for a finalized
//! job returns 200 with `duplicate: true` rather than re-running the
//! finalization. An unknown task id is 404 so a misrouted callback is
//! visible on the provider side.

use crate::orchestration::callback_processor::{self, CallbackOutcome, CallbackPayload};
use crate::web::errors::ApiResult;
use crate::web::state::AppState;
use axum::extract::State;
use axum::Json;

pub async fn synthesis_callback(
    State(state): State<AppState>,
    Json(payload): Json<CallbackPayload>,
) -> ApiResult<Json<CallbackOutcome>> {
    let outcome = callback_processor::process_callback(&state.ctx, &payload).await?;
    Ok(Json(outcome))
}
