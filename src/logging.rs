//! # Structured Logging
//!
//! Environment-aware tracing setup. Development gets human-readable console
//! output at debug level; production gets JSON at info level so pipeline
//! events (webhook outcomes, queue sweeps, dispatch decisions) can be
//! aggregated by field.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber. Safe to call more than once;
/// later calls are no-ops (tests and the server binary both call this).
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = current_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_level(&environment)));

        let registry = tracing_subscriber::registry().with(filter);

        let init_result = if environment == "production" {
            registry
                .with(fmt::layer().with_target(true).with_ansi(false).json())
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_target(true).with_ansi(true))
                .try_init()
        };

        // A subscriber may already be installed by a test harness.
        if init_result.is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }

        tracing::info!(environment = %environment, "logging initialized");
    });
}

fn current_environment() -> String {
    std::env::var("SONGFORGE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_mapping() {
        assert_eq!(default_log_level("production"), "info");
        assert_eq!(default_log_level("development"), "debug");
        assert_eq!(default_log_level("test"), "debug");
    }
}
