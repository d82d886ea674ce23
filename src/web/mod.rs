//! # HTTP Surface
//!
//! The axum router over the fulfillment pipeline:
//!
//! - `POST /webhooks/payment` — provider payment notifications.
//! - `POST /orders`, `GET /orders/:id` — checkout-facing order creation.
//! - `POST /callbacks/synthesis` — synthesis provider callbacks.
//! - `POST /admin/actions` — operator actions, internal secret required.
//! - `POST /internal/approvals/:id/{approve,reject}` — lyrics review,
//!   internal secret required.
//! - `GET /health` — liveness plus a database ping.

pub mod errors;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders/:order_id", get(handlers::orders::get_order))
        .route("/webhooks/payment", post(handlers::webhooks::payment_webhook))
        .route(
            "/callbacks/synthesis",
            post(handlers::callbacks::synthesis_callback),
        )
        .route("/admin/actions", post(handlers::admin::admin_action))
        .route(
            "/internal/approvals/:approval_id/approve",
            post(handlers::approvals::approve),
        )
        .route(
            "/internal/approvals/:approval_id/reject",
            post(handlers::approvals::reject),
        )
        .with_state(state)
}
