//! Audio-synthesis submission client.

use crate::config::SynthesisConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Submission payload. `voice` is omitted entirely when neither the
/// operator nor the brief expressed a preference, so the provider chooses.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisRequest {
    pub lyrics: String,
    pub style: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    pub callback_url: String,
}

#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Submit a synthesis task; returns the provider's task identifier.
    async fn submit(&self, request: &SynthesisRequest) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    task_id: String,
}

pub struct HttpSynthesisProvider {
    client: reqwest::Client,
    config: SynthesisConfig,
}

impl HttpSynthesisProvider {
    pub fn new(client: reqwest::Client, config: SynthesisConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Configuration(
                "synthesis API key is not configured".to_string(),
            ));
        }
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SynthesisProvider for HttpSynthesisProvider {
    async fn submit(&self, request: &SynthesisRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let body: SubmissionResponse = response.json().await?;
        if body.task_id.is_empty() {
            return Err(Error::Upstream(
                "synthesis provider returned an empty task id".to_string(),
            ));
        }
        Ok(body.task_id)
    }
}
