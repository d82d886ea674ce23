//! Liveness and database-connectivity probe.

use crate::database;
use crate::web::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, database) = match database::health_check(&state.ctx.pool).await {
        Ok(true) => (StatusCode::OK, "ok"),
        Ok(false) | Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "unreachable"),
    };
    (
        status_code,
        Json(HealthResponse {
            status: if status_code == StatusCode::OK {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            database: database.to_string(),
            timestamp: Utc::now(),
        }),
    )
}
