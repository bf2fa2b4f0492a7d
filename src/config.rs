use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OpenRegisterConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LlmSettings,
    pub objects: ObjectSettings,
    pub files: FileSettings,
    pub solr: SolrSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Embedding provider and vector backend selection.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmSettings {
    /// `openai`, `fireworks` or `ollama`.
    pub embedding_provider: String,
    /// `local`, `database` or `solr`.
    pub vector_backend: String,
    pub openai: ProviderSettings,
    pub fireworks: ProviderSettings,
    pub ollama: ProviderSettings,
}

/// Per-provider overrides. Unset fields fall back to the provider's defaults.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProviderSettings {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// How register objects are turned into text.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ObjectSettings {
    pub vectorize_all_views: bool,
    pub enabled_views: Vec<String>,
    pub include_metadata: bool,
    pub include_relations: bool,
    pub max_nesting_depth: usize,
}

/// How extracted file text is split into chunks.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FileSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_size: usize,
    /// Empty means every MIME type is eligible.
    pub allowed_mime_types: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SolrSettings {
    pub url: String,
    pub collection: String,
    pub vector_field: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_openregister_dir()
            .join("openregister.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            embedding_provider: "openai".into(),
            vector_backend: "local".into(),
            openai: ProviderSettings::default(),
            fireworks: ProviderSettings::default(),
            ollama: ProviderSettings::default(),
        }
    }
}

impl Default for ObjectSettings {
    fn default() -> Self {
        Self {
            vectorize_all_views: true,
            enabled_views: Vec::new(),
            include_metadata: true,
            include_relations: true,
            max_nesting_depth: 10,
        }
    }
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 200,
            min_chunk_size: 100,
            allowed_mime_types: Vec::new(),
        }
    }
}

impl Default for SolrSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            collection: "openregister_vectors".into(),
            vector_field: "embedding_vector".into(),
            timeout_secs: 30,
        }
    }
}

/// Read-only access to the settings the pipeline consults on every call.
///
/// Every accessor may fail; callers pick the fallback value and log it.
pub trait SettingsProvider: Send + Sync {
    fn llm_settings(&self) -> Result<LlmSettings>;
    fn object_settings(&self) -> Result<ObjectSettings>;
    fn file_settings(&self) -> Result<FileSettings>;
    fn solr_settings(&self) -> Result<SolrSettings>;
}

impl SettingsProvider for OpenRegisterConfig {
    fn llm_settings(&self) -> Result<LlmSettings> {
        Ok(self.llm.clone())
    }

    fn object_settings(&self) -> Result<ObjectSettings> {
        Ok(self.objects.clone())
    }

    fn file_settings(&self) -> Result<FileSettings> {
        Ok(self.files.clone())
    }

    fn solr_settings(&self) -> Result<SolrSettings> {
        Ok(self.solr.clone())
    }
}

/// Returns `~/.openregister/`
pub fn default_openregister_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".openregister")
}

/// Returns the default config file path: `~/.openregister/config.toml`
pub fn default_config_path() -> PathBuf {
    default_openregister_dir().join("config.toml")
}

impl OpenRegisterConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            OpenRegisterConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("OPENREGISTER_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("OPENREGISTER_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("OPENREGISTER_EMBEDDING_PROVIDER") {
            self.llm.embedding_provider = val;
        }
        if let Ok(val) = std::env::var("OPENREGISTER_VECTOR_BACKEND") {
            self.llm.vector_backend = val;
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            self.llm.openai.api_key.get_or_insert(val);
        }
        if let Ok(val) = std::env::var("FIREWORKS_API_KEY") {
            self.llm.fireworks.api_key.get_or_insert(val);
        }
        if let Ok(val) = std::env::var("OLLAMA_URL") {
            self.llm.ollama.base_url = Some(val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
