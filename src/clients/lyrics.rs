//! Text-generation client.

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One generation request. The prompt carries the brief, style, tone,
/// extracted names, addressing perspective, and (on regeneration) the
/// corrective instruction; temperature never changes between attempts.
#[derive(Debug, Clone, Serialize)]
pub struct LyricsRequest {
    pub prompt: String,
    pub style: String,
    pub tone: Option<String>,
    pub temperature: f64,
}

#[async_trait]
pub trait LyricsGenerator: Send + Sync {
    /// Returns the raw structured lyrics text.
    async fn generate(&self, request: &LyricsRequest) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    lyrics: String,
}

pub struct HttpLyricsGenerator {
    client: reqwest::Client,
    config: GenerationConfig,
}

impl HttpLyricsGenerator {
    pub fn new(client: reqwest::Client, config: GenerationConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Configuration(
                "lyrics generation API key is not configured".to_string(),
            ));
        }
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LyricsGenerator for HttpLyricsGenerator {
    async fn generate(&self, request: &LyricsRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let body: GenerationResponse = response.json().await?;
        if body.lyrics.trim().is_empty() {
            return Err(Error::Upstream(
                "generation provider returned empty lyrics".to_string(),
            ));
        }
        Ok(body.lyrics)
    }
}
