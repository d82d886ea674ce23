//! Operator action endpoint.
//!
//! One dispatching endpoint, guarded by the internal service secret.
//! Business-rule outcomes ("order was not paid", "song not releasable") are
//! HTTP 200 with `{success: false, error}` — only transport-level problems
//! (bad secret, malformed body, storage faults) use error statuses. The
//! operator tooling keys off the body, not the status.

use crate::models::{Order, Song};
use crate::orchestration::payment_processor;
use crate::state_machine::{order_target_state, OrderEvent, OrderStatus, SongStatus};
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const INTERNAL_SECRET_HEADER: &str = "x-internal-secret";

#[derive(Debug, Deserialize)]
pub struct AdminActionRequest {
    pub action: String,
    pub order_id: Option<i64>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct AdminActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdminActionResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Check the internal service secret carried in a request header.
pub fn authorize_internal(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let presented = headers
        .get(INTERNAL_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    if payment_processor::constant_time_eq(presented, &state.ctx.config.webhook.internal_secret) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// `POST /admin/actions`.
pub async fn admin_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AdminActionRequest>,
) -> ApiResult<Json<AdminActionResponse>> {
    authorize_internal(&state, &headers)?;
    info!(action = %request.action, order_id = request.order_id, "admin action");

    let response = match request.action.as_str() {
        "mark_as_paid" => mark_as_paid(&state, order_id(&request)?).await?,
        "unmark_as_paid" => unmark_as_paid(&state, order_id(&request)?).await?,
        "refund" => refund(&state, order_id(&request)?).await?,
        "cancel" => cancel(&state, order_id(&request)?).await?,
        "delete_order" => delete_order(&state, order_id(&request)?).await?,
        "release_song_now" => release_song_now(&state, order_id(&request)?).await?,
        "cleanup_pending" => cleanup_pending(&state, &request.data).await?,
        other => {
            return Err(ApiError::BadRequest(format!("unknown action: {other}")));
        }
    };
    Ok(Json(response))
}

fn order_id(request: &AdminActionRequest) -> ApiResult<i64> {
    request
        .order_id
        .ok_or_else(|| ApiError::BadRequest("order_id is required for this action".to_string()))
}

/// Pre-check an operator event against the order state machine. Returns the
/// business-rule rejection as a failed response, or `None` when the event is
/// legal. The subsequent write still carries its own race-closing condition.
async fn check_order_event(
    state: &AppState,
    order_id: i64,
    event: &OrderEvent,
) -> ApiResult<Option<AdminActionResponse>> {
    let Some(order) = Order::find_by_id(&state.ctx.pool, order_id).await? else {
        return Ok(Some(AdminActionResponse::failed(format!(
            "order {order_id} does not exist"
        ))));
    };
    let current: OrderStatus = order
        .status
        .parse()
        .map_err(|_| ApiError::Internal)?;
    match order_target_state(current, event) {
        Ok(_) => Ok(None),
        Err(err) => Ok(Some(AdminActionResponse::failed(format!(
            "order {order_id}: {err}"
        )))),
    }
}

async fn mark_as_paid(state: &AppState, order_id: i64) -> ApiResult<AdminActionResponse> {
    if let Some(rejected) = check_order_event(state, order_id, &OrderEvent::MarkPaid).await? {
        return Ok(rejected);
    }
    match Order::mark_paid(&state.ctx.pool, order_id, Some("manual"), None).await? {
        Some(order) => {
            payment_processor::fire_downstream(&state.ctx, order);
            Ok(AdminActionResponse::ok(format!(
                "order {order_id} marked as paid"
            )))
        }
        None => Ok(AdminActionResponse::failed(format!(
            "order {order_id} is already paid"
        ))),
    }
}

async fn unmark_as_paid(state: &AppState, order_id: i64) -> ApiResult<AdminActionResponse> {
    if let Some(rejected) = check_order_event(state, order_id, &OrderEvent::UnmarkPaid).await? {
        return Ok(rejected);
    }
    match Order::unmark_paid(&state.ctx.pool, order_id).await? {
        Some(_) => Ok(AdminActionResponse::ok(format!(
            "order {order_id} returned to pending"
        ))),
        None => Ok(AdminActionResponse::failed(format!(
            "order {order_id} is not in a paid state"
        ))),
    }
}

async fn refund(state: &AppState, order_id: i64) -> ApiResult<AdminActionResponse> {
    if let Some(rejected) = check_order_event(state, order_id, &OrderEvent::Refund).await? {
        return Ok(rejected);
    }
    match Order::refund(&state.ctx.pool, order_id).await? {
        Some(_) => Ok(AdminActionResponse::ok(format!("order {order_id} refunded"))),
        None => Ok(AdminActionResponse::failed(format!(
            "order {order_id} is not in a refundable state"
        ))),
    }
}

async fn cancel(state: &AppState, order_id: i64) -> ApiResult<AdminActionResponse> {
    if let Some(rejected) = check_order_event(state, order_id, &OrderEvent::Cancel).await? {
        return Ok(rejected);
    }
    match Order::cancel(&state.ctx.pool, order_id).await? {
        Some(_) => Ok(AdminActionResponse::ok(format!("order {order_id} cancelled"))),
        None => Ok(AdminActionResponse::failed(format!(
            "order {order_id} is not in a cancellable state"
        ))),
    }
}

async fn delete_order(state: &AppState, order_id: i64) -> ApiResult<AdminActionResponse> {
    if Order::delete(&state.ctx.pool, order_id).await? == 1 {
        Ok(AdminActionResponse::ok(format!("order {order_id} deleted")))
    } else {
        Ok(AdminActionResponse::failed(format!(
            "order {order_id} does not exist"
        )))
    }
}

async fn release_song_now(state: &AppState, order_id: i64) -> ApiResult<AdminActionResponse> {
    let Some(song) = Song::find_by_order(&state.ctx.pool, order_id).await? else {
        return Ok(AdminActionResponse::failed(format!(
            "order {order_id} has no song"
        )));
    };
    let current: SongStatus = song.status.parse().map_err(|_| ApiError::Internal)?;
    if current.is_released() {
        return Ok(AdminActionResponse::failed(format!(
            "song {} is already released",
            song.id
        )));
    }
    match Song::release(&state.ctx.pool, song.id).await? {
        Some(released) => Ok(AdminActionResponse::ok(format!(
            "song {} released",
            released.id
        ))),
        None => Ok(AdminActionResponse::failed(format!(
            "song {} is not in a releasable state",
            song.id
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct CleanupData {
    #[serde(default = "default_cleanup_age")]
    older_than_hours: i64,
}

fn default_cleanup_age() -> i64 {
    24
}

async fn cleanup_pending(
    state: &AppState,
    data: &serde_json::Value,
) -> ApiResult<AdminActionResponse> {
    let data: CleanupData = if data.is_null() {
        CleanupData {
            older_than_hours: default_cleanup_age(),
        }
    } else {
        serde_json::from_value(data.clone())
            .map_err(|e| ApiError::BadRequest(format!("invalid cleanup data: {e}")))?
    };
    if data.older_than_hours <= 0 {
        return Err(ApiError::BadRequest(
            "older_than_hours must be positive".to_string(),
        ));
    }
    let removed = Order::cleanup_pending(&state.ctx.pool, data.older_than_hours).await?;
    Ok(AdminActionResponse::ok(format!(
        "removed {removed} stale pending order(s)"
    )))
}
