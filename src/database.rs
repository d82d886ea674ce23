//! # Database Connection
//!
//! Pool construction and health checking. The pool is created once at
//! process start from [`DatabaseConfig`](crate::config::DatabaseConfig) and
//! handed to components by dependency injection; durable storage is the sole
//! coordination point between concurrently running entry points.

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;

/// Build a Postgres pool from configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
        .connect(&config.url)
        .await?;
    Ok(pool)
}

/// Cheap liveness probe used by the health endpoint.
pub async fn health_check(pool: &PgPool) -> Result<bool> {
    let row = sqlx::query("SELECT 1 AS health").fetch_one(pool).await?;
    let health: i32 = row.get("health");
    Ok(health == 1)
}
