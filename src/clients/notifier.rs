//! Customer notification provider.

use crate::config::NotificationConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct NotificationRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub sender: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notification; returns the provider's message id.
    async fn send(&self, request: &NotificationRequest) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    message_id: String,
}

pub struct HttpNotifier {
    client: reqwest::Client,
    config: NotificationConfig,
}

impl HttpNotifier {
    pub fn new(client: reqwest::Client, config: NotificationConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Configuration(
                "notification API key is not configured".to_string(),
            ));
        }
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, request: &NotificationRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let body: SendResponse = response.json().await?;
        Ok(body.message_id)
    }
}
