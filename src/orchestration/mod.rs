//! # Fulfillment Orchestration
//!
//! The pipeline components, in control-flow order:
//!
//! 1. [`order_creator`] — atomic Quiz+Order creation from checkout input.
//! 2. [`payment_processor`] — webhook ingestion and the at-most-once paid
//!    transition.
//! 3. [`lyrics_orchestrator`] — generate, validate, regenerate with
//!    corrective feedback, bounded.
//! 4. [`synthesis_dispatcher`] / [`callback_processor`] — async synthesis
//!    submission with duplicate protection, callback finalization.
//! 5. [`retry_queue`] — durable recovery sweep for failed writes.
//! 6. [`notifications`] — deduplicated best-effort fan-out.
//!
//! Everything receives a [`PipelineContext`] built once at process start;
//! durable storage is the only coordination between concurrent entry points.

pub mod callback_processor;
pub mod lyrics_orchestrator;
pub mod notifications;
pub mod order_creator;
pub mod payment_processor;
pub mod retry_queue;
pub mod synthesis_dispatcher;

use crate::clients::{LyricsGenerator, MediaStore, Notifier, SynthesisProvider};
use crate::config::SongforgeConfig;
use sqlx::PgPool;
use std::sync::Arc;

/// Explicit dependency bundle for the pipeline. Constructed once in the
/// server binary and passed by injection; there is no global client handle.
#[derive(Clone)]
pub struct PipelineContext {
    pub pool: PgPool,
    pub config: SongforgeConfig,
    pub lyrics: Arc<dyn LyricsGenerator>,
    pub synthesis: Arc<dyn SynthesisProvider>,
    pub media: Arc<dyn MediaStore>,
    pub notifier: Arc<dyn Notifier>,
}
