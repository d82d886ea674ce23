//! # HTTP Request Handlers
//!
//! One module per functional area. Handlers translate between the wire and
//! the orchestration layer; every status-code decision lives in
//! [`errors`](crate::web::errors).

pub mod admin;
pub mod approvals;
pub mod callbacks;
pub mod health;
pub mod orders;
pub mod webhooks;
