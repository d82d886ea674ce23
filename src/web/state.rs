//! # Web Application State
//!
//! Shared state for every handler: the pipeline context (pool, config,
//! client handles) behind an `Arc`. Cloned per request by axum; no handler
//! holds mutable state.

use crate::orchestration::PipelineContext;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<PipelineContext>,
}

impl AppState {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }
}
