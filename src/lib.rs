//! # songforge-core
//!
//! Order and job orchestration for paid personalized-song fulfillment:
//! payment-webhook ingestion, atomic order creation, a bounded
//! generate-validate-regenerate lyrics loop, asynchronous audio-synthesis
//! dispatch with callback correlation, a durable retry queue, and
//! deduplicated customer notifications.
//!
//! ## Architecture
//!
//! - **`models`** — sqlx-backed persistence, one module per entity.
//!   Idempotency-critical transitions are conditional SQL updates, so races
//!   between concurrent deliveries are closed at the storage layer.
//! - **`state_machine`** — status vocabularies and legal transitions.
//! - **`analysis` / `validation`** — pure text analysis of the customer
//!   brief and deterministic rule validation of generated lyrics.
//! - **`clients`** — trait seams for the generation, synthesis, media, and
//!   notification providers, with reqwest implementations.
//! - **`orchestration`** — the pipeline itself, driven through a
//!   [`PipelineContext`](orchestration::PipelineContext) built once at
//!   startup.
//! - **`web`** — the axum HTTP surface.
//! - **`resilience`** — bounded retry and deadline combinators shared by
//!   every external call.
//!
//! At-least-once inputs (webhooks, callbacks, queue sweeps) everywhere,
//! at-most-once effects via conditional writes and unique keys.

pub mod analysis;
pub mod clients;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod resilience;
pub mod state_machine;
pub mod validation;
pub mod web;

pub use config::SongforgeConfig;
pub use error::{Error, Result};
pub use orchestration::PipelineContext;
