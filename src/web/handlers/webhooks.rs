//! Payment webhook endpoint.
//!
//! Providers retry on non-2xx, so the mapping is deliberate: 200 for every
//! processed/ignored/duplicate outcome, 401 only for a bad secret, 404 when
//! no order can be resolved (the provider should surface that), 5xx for
//! faults worth a redelivery.

use crate::orchestration::payment_processor::{self, WebhookPayload, WebhookOutcome};
use crate::web::errors::ApiResult;
use crate::web::state::AppState;
use axum::extract::State;
use axum::Json;

pub async fn payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> ApiResult<Json<WebhookOutcome>> {
    let outcome = payment_processor::process_payment_webhook(&state.ctx, &payload).await?;
    Ok(Json(outcome))
}
