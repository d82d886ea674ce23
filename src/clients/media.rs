//! Media re-hosting.
//!
//! Provider result URLs expire; the callback processor downloads the audio
//! and uploads it to owned storage before the song is considered ready.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Download `source_url` and persist it under `key` in owned storage.
    /// Returns the durable public URL.
    async fn rehost(&self, source_url: &str, key: &str) -> Result<String>;
}

pub struct HttpMediaStore {
    client: reqwest::Client,
    config: StorageConfig,
}

impl HttpMediaStore {
    pub fn new(client: reqwest::Client, config: StorageConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn rehost(&self, source_url: &str, key: &str) -> Result<String> {
        let download = self
            .client
            .get(source_url)
            .send()
            .await?
            .error_for_status()?;
        let bytes = download.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::Upstream(format!(
                "provider media at {source_url} was empty"
            )));
        }

        self.client
            .put(format!("{}/{key}", self.config.upload_url))
            .bearer_auth(&self.config.api_key)
            .body(bytes.to_vec())
            .send()
            .await?
            .error_for_status()?;

        Ok(format!("{}/{key}", self.config.public_url))
    }
}
