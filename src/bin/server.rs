//! Fulfillment server binary: configuration, pool, clients, HTTP router,
//! and the background retry sweeper.

use anyhow::Context;
use songforge_core::clients::{
    HttpLyricsGenerator, HttpMediaStore, HttpNotifier, HttpSynthesisProvider,
};
use songforge_core::orchestration::retry_queue;
use songforge_core::web::{self, state::AppState};
use songforge_core::{database, logging, PipelineContext, SongforgeConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let config = SongforgeConfig::from_env().context("loading configuration")?;
    let pool = database::connect(&config.database)
        .await
        .context("connecting to Postgres")?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .context("building HTTP client")?;

    let ctx = PipelineContext {
        pool,
        lyrics: Arc::new(
            HttpLyricsGenerator::new(http.clone(), config.generation.clone())
                .context("configuring lyrics client")?,
        ),
        synthesis: Arc::new(
            HttpSynthesisProvider::new(http.clone(), config.synthesis.clone())
                .context("configuring synthesis client")?,
        ),
        media: Arc::new(HttpMediaStore::new(http.clone(), config.storage.clone())),
        notifier: Arc::new(
            HttpNotifier::new(http, config.notifications.clone())
                .context("configuring notification client")?,
        ),
        config,
    };

    tokio::spawn(retry_queue::run_sweeper(ctx.clone()));

    let bind_address = ctx.config.server.bind_address.clone();
    let router = web::build_router(AppState::new(ctx));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {bind_address}"))?;
    info!(address = %bind_address, "songforge server listening");
    axum::serve(listener, router).await.context("serving HTTP")?;
    Ok(())
}
