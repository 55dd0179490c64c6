use std::time::Duration;

use async_trait::async_trait;
use promptgate_common::BackendConfig;
use serde::{Deserialize, Serialize};

/// A screened generation call, ready for the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    /// The assembled instruction, not the raw user prompt.
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// The text-generation service the gateway protects.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String>;
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    text: String,
}

/// JSON-over-HTTP backend client.
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpBackend {
    pub fn from_config(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        tracing::info!(url = %config.url, model = %config.model, "backend client configured");

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let body: GenerationResponse = response.json().await?;
        Ok(body.text)
    }
}
