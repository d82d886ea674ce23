//! # Configuration
//!
//! Environment-derived configuration for the fulfillment pipeline. One
//! struct per concern, all collected into [`SongforgeConfig`], constructed
//! once at process start and passed by dependency injection — there is no
//! global configuration handle.
//!
//! Required secrets (`SONGFORGE_WEBHOOK_SECRET`, `SONGFORGE_INTERNAL_SECRET`)
//! fail construction with a configuration error rather than defaulting.

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct SongforgeConfig {
    pub database: DatabaseConfig,
    pub webhook: WebhookConfig,
    pub generation: GenerationConfig,
    pub synthesis: SynthesisConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationConfig,
    pub retry_queue: RetryQueueConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/songforge_development".to_string(),
            max_connections: 10,
            acquire_timeout_ms: 5_000,
        }
    }
}

/// Shared secrets for inbound traffic. The webhook secret authenticates the
/// payment provider; the internal secret authenticates service-to-service
/// calls (admin actions, generation kickoff) and is deliberately distinct.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub payment_secret: String,
    pub internal_secret: String,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_url: String,
    pub api_key: String,
    /// Regeneration bound for the validate-and-correct loop.
    pub max_attempts: u32,
    pub request_timeout_ms: u64,
    /// Held constant across regeneration attempts; only the corrective
    /// instruction text changes between attempts.
    pub temperature: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.lyrics.example/v1/generate".to_string(),
            api_key: String::new(),
            max_attempts: 3,
            request_timeout_ms: 60_000,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub api_url: String,
    pub api_key: String,
    pub callback_url: String,
    pub request_timeout_ms: u64,
    pub download_timeout_ms: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.synthesis.example/v1/tasks".to_string(),
            api_key: String::new(),
            callback_url: "https://songforge.example/callbacks/synthesis".to_string(),
            request_timeout_ms: 30_000,
            download_timeout_ms: 120_000,
        }
    }
}

/// Owned media hosting: synthesized audio is downloaded from the provider
/// and re-hosted here before release.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_url: String,
    pub public_url: String,
    pub api_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_url: "https://storage.songforge.example/upload".to_string(),
            public_url: "https://media.songforge.example".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender: String,
    pub max_attempts: u32,
    pub request_timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.mail.example/v1/send".to_string(),
            api_key: String::new(),
            sender: "orders@songforge.example".to_string(),
            max_attempts: 5,
            request_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryQueueConfig {
    pub batch_size: i64,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    /// Delay between items within a sweep, to bound downstream load.
    pub inter_item_delay_ms: u64,
    /// Items stuck in `processing` longer than this are reclaimed to
    /// `pending` at the start of a sweep (crashed-sweep recovery).
    pub processing_lease_ms: u64,
    pub sweep_interval_ms: u64,
}

impl Default for RetryQueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            backoff_base_ms: 60_000,
            backoff_cap_ms: 3_600_000,
            inter_item_delay_ms: 250,
            processing_lease_ms: 600_000,
            sweep_interval_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

impl SongforgeConfig {
    /// Build configuration from the environment. Secrets are required; the
    /// rest fall back to defaults suitable for development.
    pub fn from_env() -> Result<Self> {
        let mut database = DatabaseConfig::default();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            database.url = url;
        }
        if let Ok(max) = std::env::var("SONGFORGE_DB_MAX_CONNECTIONS") {
            database.max_connections = parse_var("SONGFORGE_DB_MAX_CONNECTIONS", &max)?;
        }

        let webhook = WebhookConfig {
            payment_secret: require_var("SONGFORGE_WEBHOOK_SECRET")?,
            internal_secret: require_var("SONGFORGE_INTERNAL_SECRET")?,
        };

        let mut generation = GenerationConfig::default();
        if let Ok(url) = std::env::var("SONGFORGE_GENERATION_URL") {
            generation.api_url = url;
        }
        if let Ok(key) = std::env::var("SONGFORGE_GENERATION_API_KEY") {
            generation.api_key = key;
        }
        if let Ok(attempts) = std::env::var("SONGFORGE_GENERATION_MAX_ATTEMPTS") {
            generation.max_attempts = parse_var("SONGFORGE_GENERATION_MAX_ATTEMPTS", &attempts)?;
        }

        let mut synthesis = SynthesisConfig::default();
        if let Ok(url) = std::env::var("SONGFORGE_SYNTHESIS_URL") {
            synthesis.api_url = url;
        }
        if let Ok(key) = std::env::var("SONGFORGE_SYNTHESIS_API_KEY") {
            synthesis.api_key = key;
        }
        if let Ok(url) = std::env::var("SONGFORGE_CALLBACK_URL") {
            synthesis.callback_url = url;
        }

        let mut storage = StorageConfig::default();
        if let Ok(url) = std::env::var("SONGFORGE_STORAGE_UPLOAD_URL") {
            storage.upload_url = url;
        }
        if let Ok(url) = std::env::var("SONGFORGE_STORAGE_PUBLIC_URL") {
            storage.public_url = url;
        }
        if let Ok(key) = std::env::var("SONGFORGE_STORAGE_API_KEY") {
            storage.api_key = key;
        }

        let mut notifications = NotificationConfig::default();
        if let Ok(url) = std::env::var("SONGFORGE_NOTIFICATION_URL") {
            notifications.api_url = url;
        }
        if let Ok(key) = std::env::var("SONGFORGE_NOTIFICATION_API_KEY") {
            notifications.api_key = key;
        }
        if let Ok(attempts) = std::env::var("SONGFORGE_NOTIFICATION_MAX_ATTEMPTS") {
            notifications.max_attempts =
                parse_var("SONGFORGE_NOTIFICATION_MAX_ATTEMPTS", &attempts)?;
        }

        let mut retry_queue = RetryQueueConfig::default();
        if let Ok(batch) = std::env::var("SONGFORGE_RETRY_BATCH_SIZE") {
            retry_queue.batch_size = parse_var("SONGFORGE_RETRY_BATCH_SIZE", &batch)?;
        }
        if let Ok(interval) = std::env::var("SONGFORGE_RETRY_SWEEP_INTERVAL_MS") {
            retry_queue.sweep_interval_ms =
                parse_var("SONGFORGE_RETRY_SWEEP_INTERVAL_MS", &interval)?;
        }

        let mut server = ServerConfig::default();
        if let Ok(addr) = std::env::var("SONGFORGE_BIND_ADDRESS") {
            server.bind_address = addr;
        }

        Ok(Self {
            database,
            webhook,
            generation,
            synthesis,
            storage,
            notifications,
            retry_queue,
            server,
        })
    }
}

fn require_var(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Configuration(format!(
            "required environment variable {name} is not set"
        ))),
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| Error::Configuration(format!("invalid {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let queue = RetryQueueConfig::default();
        assert_eq!(queue.batch_size, 50);
        assert!(queue.backoff_cap_ms >= queue.backoff_base_ms);

        let generation = GenerationConfig::default();
        assert_eq!(generation.max_attempts, 3);
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        std::env::remove_var("SONGFORGE_WEBHOOK_SECRET");
        let err = require_var("SONGFORGE_WEBHOOK_SECRET").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
