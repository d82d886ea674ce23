//! Order creation and lookup endpoints.

use crate::orchestration::order_creator::{self, OrderCreationRequest};
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    pub success: bool,
    pub order_id: i64,
    pub quiz_id: i64,
    pub already_existed: bool,
}

/// `POST /orders`. Validation and business failures come back as
/// `{success: false, error, log_id}` with a 4xx/5xx status; the log id is
/// the customer-support reference for the audit row.
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<OrderCreationRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), (StatusCode, Json<Value>)> {
    match order_creator::create_order(&state.ctx.pool, &request).await {
        Ok(result) => {
            let status = if result.already_existed {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            Ok((
                status,
                Json(OrderCreatedResponse {
                    success: true,
                    order_id: result.order_id,
                    quiz_id: result.quiz_id,
                    already_existed: result.already_existed,
                }),
            ))
        }
        Err(failure) => {
            let message = failure.error.to_string();
            let status = ApiError::from(failure.error).status_code();
            Err((
                status,
                Json(json!({
                    "success": false,
                    "error": message,
                    "log_id": failure.log_id,
                })),
            ))
        }
    }
}

/// `GET /orders/:id`.
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> ApiResult<Json<crate::models::Order>> {
    let order = crate::models::Order::find_by_id(&state.ctx.pool, order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {order_id}")))?;
    Ok(Json(order))
}
