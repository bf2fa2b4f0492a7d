//! OpenAI-compatible embeddings generator.
//!
//! Talks to `POST {base_url}/embeddings`. Fireworks exposes the same API, so
//! both providers share this implementation and differ only in base URL.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{EmbeddingGenerator, ProviderKind};

pub struct OpenAiGenerator {
    client: reqwest::Client,
    provider: ProviderKind,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiGenerator {
    pub fn new(
        provider: ProviderKind,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(anyhow!("{provider} API key is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            provider,
            api_key,
            model: model.into(),
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingGenerator for OpenAiGenerator {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingsRequest {
            input: text,
            model: &self.model,
        };

        debug!(provider = %self.provider, model = %self.model, chars = text.len(), "embedding request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("{} request failed: {e}", self.provider))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(provider = %self.provider, %status, "embedding API error");
            return Err(anyhow!("{} API error {status}: {body}", self.provider));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("failed to parse {} response: {e}", self.provider))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow!("no embedding returned from {}", self.provider))
    }

    fn provider(&self) -> &str {
        self.provider.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }
}
