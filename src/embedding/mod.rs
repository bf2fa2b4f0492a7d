//! Text-to-vector embedding generators.
//!
//! Provides the [`EmbeddingGenerator`] trait, the provider catalogue
//! ([`ProviderKind`]), resolution of the effective provider/model
//! configuration, and the [`GeneratorFactory`] that builds HTTP generators
//! for OpenAI, Fireworks and Ollama.

pub mod ollama;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{LlmSettings, ProviderSettings};
use crate::error::VectorError;

/// Providers that refuse requests without an API key.
pub const PROVIDERS_REQUIRING_KEY: &[&str] = &["openai", "fireworks"];

/// A configured connection to one embedding model.
#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    /// Embed a single text.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Provider name for logging (`"openai"`, `"ollama"`, ...).
    fn provider(&self) -> &str;

    /// Model identifier recorded next to every stored vector.
    fn model(&self) -> &str;
}

/// Supported embedding providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Fireworks,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Fireworks => "fireworks",
            Self::Ollama => "ollama",
        }
    }

    /// Model used when neither the caller nor the settings name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "text-embedding-ada-002",
            Self::Fireworks => "nomic-ai/nomic-embed-text-v1.5",
            Self::Ollama => "nomic-embed-text",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Fireworks => "https://api.fireworks.ai/inference/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        PROVIDERS_REQUIRING_KEY.contains(&self.as_str())
    }

    fn settings<'a>(&self, llm: &'a LlmSettings) -> &'a ProviderSettings {
        match self {
            Self::OpenAi => &llm.openai,
            Self::Fireworks => &llm.fireworks,
            Self::Ollama => &llm.ollama,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "fireworks" => Ok(Self::Fireworks),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("unknown embedding provider: {other}")),
        }
    }
}

/// Fully resolved generator configuration. Also the generator cache key, so
/// any change (including a rotated API key) yields a fresh generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl EmbeddingConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// Resolve the effective configuration: explicit override, then the
/// configured default provider, then the provider's built-in model.
pub fn resolve_embedding_config(
    llm: &LlmSettings,
    provider_override: Option<&str>,
) -> Result<EmbeddingConfig, VectorError> {
    let name = provider_override
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(llm.embedding_provider.as_str());
    let provider: ProviderKind = name.parse().map_err(VectorError::Config)?;
    let settings = provider.settings(llm);

    let model = settings
        .model
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| provider.default_model().to_string());

    Ok(EmbeddingConfig {
        provider,
        model,
        api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
        base_url: settings.base_url.clone(),
    })
}

/// Builds generators from resolved configuration.
pub trait GeneratorFactory: Send + Sync {
    fn create(&self, config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingGenerator>, VectorError>;
}

/// Factory for the HTTP-backed generators.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpGeneratorFactory;

impl GeneratorFactory for HttpGeneratorFactory {
    fn create(&self, config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingGenerator>, VectorError> {
        match config.provider {
            ProviderKind::OpenAi | ProviderKind::Fireworks => {
                let key = config.api_key.clone().ok_or_else(|| {
                    VectorError::Config(format!("{} API key is required", config.provider))
                })?;
                let generator = openai::OpenAiGenerator::new(
                    config.provider,
                    key,
                    &config.model,
                    config.base_url(),
                )?;
                Ok(Arc::new(generator))
            }
            ProviderKind::Ollama => {
                let generator = ollama::OllamaGenerator::new(&config.model, config.base_url())?;
                Ok(Arc::new(generator))
            }
        }
    }
}
