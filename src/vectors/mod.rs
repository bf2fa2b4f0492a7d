//! Embedding, storage and search facade.
//!
//! [`VectorEmbeddings`] resolves the embedding provider and the vector backend
//! from settings on every call, caches generators per resolved configuration,
//! and exposes the diagnostics (`check_embedding_model_mismatch`) and the
//! destructive `clear_all_embeddings` used by the admin commands.

pub mod hybrid;
pub mod solr;
pub mod storage;
pub mod types;

use anyhow::anyhow;
use async_trait::async_trait;
use rusqlite::TransactionBehavior;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SettingsProvider;
use crate::db::{self, SharedConnection};
use crate::embedding::{
    resolve_embedding_config, EmbeddingConfig, EmbeddingGenerator, GeneratorFactory,
    ProviderKind,
};
use crate::error::{Result, VectorError};
use crate::vectorization::EmbeddingCoordinator;
use solr::SolrVectorStore;
use storage::{SqliteVectorStore, VectorStore};
use types::{
    ClearResult, CustomEmbeddingConfig, EmbeddingResult, GeneratedEmbedding, HybridSearchResult,
    HybridWeights, KeywordHit, ModelMismatchReport, NewVector, SearchFilters, VectorBackend,
    VectorHit, VectorStats,
};

/// Default number of hits for [`VectorEmbeddings::semantic_search`].
pub const DEFAULT_SEMANTIC_LIMIT: usize = 10;
/// Default number of hits for [`VectorEmbeddings::hybrid_search`].
pub const DEFAULT_HYBRID_LIMIT: usize = 20;

pub struct VectorEmbeddings {
    db: SharedConnection,
    settings: Arc<dyn SettingsProvider>,
    factory: Arc<dyn GeneratorFactory>,
    generators: Mutex<HashMap<EmbeddingConfig, Arc<dyn EmbeddingGenerator>>>,
}

impl VectorEmbeddings {
    pub fn new(
        db: SharedConnection,
        settings: Arc<dyn SettingsProvider>,
        factory: Arc<dyn GeneratorFactory>,
    ) -> Self {
        Self {
            db,
            settings,
            factory,
            generators: Mutex::new(HashMap::new()),
        }
    }

    /// Effective configuration for `provider`, or the configured default.
    pub fn resolve_config(&self, provider: Option<&str>) -> Result<EmbeddingConfig> {
        let llm = self
            .settings
            .llm_settings()
            .map_err(|e| VectorError::Config(format!("LLM settings unavailable: {e}")))?;
        resolve_embedding_config(&llm, provider)
    }

    fn generator(&self, provider: Option<&str>) -> Result<Arc<dyn EmbeddingGenerator>> {
        let config = self.resolve_config(provider)?;

        let mut cache = self
            .generators
            .lock()
            .map_err(|e| anyhow!("generator cache poisoned: {e}"))?;
        if let Some(generator) = cache.get(&config) {
            return Ok(generator.clone());
        }

        let generator = self.factory.create(&config)?;
        debug!(provider = %config.provider, model = %config.model, "embedding generator created");
        // Settings changed for this provider: drop the generators they replace.
        cache.retain(|cached, _| cached.provider != config.provider);
        cache.insert(config, generator.clone());
        Ok(generator)
    }

    /// Embed one text with the resolved provider.
    pub async fn generate_embedding(
        &self,
        text: &str,
        provider: Option<&str>,
    ) -> Result<GeneratedEmbedding> {
        let generator = self.generator(provider).map_err(collapse)?;
        embed_with(generator.as_ref(), text).await
    }

    /// Embed one text with an explicit configuration instead of the settings.
    pub async fn generate_embedding_with_custom_config(
        &self,
        text: &str,
        custom: &CustomEmbeddingConfig,
    ) -> Result<GeneratedEmbedding> {
        let provider_name = custom
            .provider
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| VectorError::Config("embedding provider is required".into()))?;
        let model = custom
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| VectorError::Config("embedding model is required".into()))?;
        let provider: ProviderKind = provider_name.parse().map_err(VectorError::Config)?;

        let api_key = custom.api_key.clone().filter(|k| !k.trim().is_empty());
        if provider.requires_api_key() && api_key.is_none() {
            return Err(VectorError::Config(format!("{provider} API key is required")));
        }

        let config = EmbeddingConfig {
            provider,
            model: model.to_string(),
            api_key,
            base_url: custom.base_url.clone(),
        };
        info!(provider = %config.provider, model = %config.model, "testing embedding configuration");

        let generator = self.factory.create(&config).map_err(collapse)?;
        embed_with(generator.as_ref(), text).await
    }

    /// Embed each text in turn. Per-text failures are reported in the result
    /// list; only resolving the generator can fail the call.
    pub async fn generate_batch_embeddings(
        &self,
        texts: &[String],
        provider: Option<&str>,
    ) -> Result<Vec<EmbeddingResult>> {
        let generator = self.generator(provider).map_err(collapse)?;
        let model = generator.model().to_string();

        let mut results = Vec::with_capacity(texts.len());
        for (position, text) in texts.iter().enumerate() {
            match generator.embed_text(text).await {
                Ok(embedding) => results.push(EmbeddingResult::success(embedding, &model)),
                Err(e) => {
                    warn!(position, error = %e, "batch embedding failed for text");
                    results.push(EmbeddingResult::failure(&model, e.to_string()));
                }
            }
        }

        debug!(count = texts.len(), model = %model, "batch embeddings generated");
        Ok(results)
    }

    /// Which backend settings select. A settings failure falls back to `local`.
    pub fn backend_kind(&self) -> Result<VectorBackend> {
        match self.settings.llm_settings() {
            Ok(llm) => llm
                .vector_backend
                .parse::<VectorBackend>()
                .map_err(VectorError::Config),
            Err(e) => {
                warn!(error = %e, "could not read vector backend setting, using local");
                Ok(VectorBackend::Local)
            }
        }
    }

    /// The backend named in settings. A settings failure falls back to `local`.
    pub fn active_backend(&self) -> Result<Arc<dyn VectorStore>> {
        let store: Arc<dyn VectorStore> = match self.backend_kind()? {
            VectorBackend::Local => Arc::new(SqliteVectorStore::local(self.db.clone())),
            VectorBackend::Database => Arc::new(SqliteVectorStore::database(self.db.clone())),
            VectorBackend::Solr => {
                let solr = self
                    .settings
                    .solr_settings()
                    .and_then(|s| SolrVectorStore::new(&s))
                    .map_err(|e| VectorError::Config(e.to_string()))?;
                Arc::new(solr)
            }
        };
        Ok(store)
    }

    /// Persist one vector in the active backend and return its id.
    pub async fn store_vector(&self, vector: &NewVector) -> Result<i64> {
        let backend = self.active_backend()?;
        let id = backend
            .store(vector)
            .await
            .map_err(|e| VectorError::Storage(e.to_string()))?;

        debug!(
            backend = backend.name(),
            entity_type = %vector.metadata.entity_type,
            entity_id = %vector.metadata.entity_id,
            chunk_index = vector.metadata.chunk_index,
            id,
            "vector stored"
        );
        Ok(id)
    }

    /// Embed `query` and return its nearest stored vectors.
    pub async fn semantic_search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
        provider: Option<&str>,
    ) -> Result<Vec<VectorHit>> {
        let embedded = self.generate_embedding(query, provider).await?;
        let backend = self.active_backend()?;
        let hits = backend
            .search(&embedded.embedding, limit, filters)
            .await
            .map_err(|e| VectorError::Storage(e.to_string()))?;

        debug!(backend = backend.name(), count = hits.len(), "semantic search finished");
        Ok(hits)
    }

    /// Blend vector similarity with pre-fetched keyword hits.
    pub async fn hybrid_search(
        &self,
        query: &str,
        keyword_hits: &[KeywordHit],
        limit: usize,
        weights: HybridWeights,
        provider: Option<&str>,
    ) -> Result<HybridSearchResult> {
        let started = Instant::now();

        let vector_hits = self
            .semantic_search(query, limit.saturating_mul(2), &SearchFilters::default(), provider)
            .await?;
        let (results, source_breakdown) = hybrid::blend(&vector_hits, keyword_hits, weights, limit);

        Ok(HybridSearchResult {
            total: results.len(),
            results,
            search_time_ms: started.elapsed().as_millis() as u64,
            source_breakdown,
            weights,
        })
    }

    /// Vector totals for the active backend.
    pub async fn get_stats(&self) -> Result<VectorStats> {
        let backend = self.active_backend()?;
        backend
            .stats()
            .await
            .map_err(|e| VectorError::Storage(e.to_string()))
    }

    /// Compare the configured model with the models recorded in the vectors
    /// table. Solr documents are not inspected. Never fails; problems are
    /// reported in the `error` field.
    pub fn check_embedding_model_mismatch(&self) -> ModelMismatchReport {
        match self.model_mismatch_report() {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "embedding model check failed");
                ModelMismatchReport {
                    has_vectors: false,
                    mismatch: false,
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        }
    }

    fn model_mismatch_report(&self) -> anyhow::Result<ModelMismatchReport> {
        let current_model = self.resolve_config(None)?.model;

        let conn = db::lock(&self.db)?;
        let (total, null_count): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), \
             COALESCE(SUM(CASE WHEN embedding_model IS NULL OR embedding_model = '' THEN 1 ELSE 0 END), 0) \
             FROM vectors",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        if total == 0 {
            return Ok(ModelMismatchReport {
                has_vectors: false,
                mismatch: false,
                current_model: Some(current_model),
                message: "No vectors exist yet".to_string(),
                ..Default::default()
            });
        }

        let mut stmt = conn.prepare(
            "SELECT DISTINCT embedding_model FROM vectors \
             WHERE embedding_model IS NOT NULL AND embedding_model != '' ORDER BY embedding_model",
        )?;
        let existing_models = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mismatch = existing_models.len() > 1
            || null_count > 0
            || existing_models.first().is_some_and(|m| *m != current_model);

        let message = if mismatch {
            format!(
                "Embedding model mismatch: stored vectors use [{}] ({null_count} without a model), current model is {current_model}. Re-vectorize to search consistently.",
                existing_models.join(", ")
            )
        } else {
            format!("All vectors use the current embedding model ({current_model})")
        };

        Ok(ModelMismatchReport {
            has_vectors: true,
            mismatch,
            current_model: Some(current_model),
            existing_models,
            total_vectors: total as u64,
            null_model_count: null_count as u64,
            message,
            error: None,
        })
    }

    /// Delete every row of the vectors table. Solr documents are left alone.
    /// Never fails; problems are reported as `success: false`.
    pub fn clear_all_embeddings(&self) -> ClearResult {
        match self.delete_all_vectors() {
            Ok(deleted) => {
                info!(deleted, "all embeddings cleared");
                ClearResult {
                    success: true,
                    deleted,
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "clearing embeddings failed");
                ClearResult {
                    success: false,
                    deleted: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn delete_all_vectors(&self) -> anyhow::Result<u64> {
        let mut conn = db::lock(&self.db)?;
        // IMMEDIATE takes the write lock before counting, so no insert can
        // land between the count and the delete.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let count: i64 = tx.query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get(0))?;
        if count == 0 {
            return Ok(0);
        }

        tx.execute("DELETE FROM vectors", [])?;
        tx.commit()?;
        Ok(count as u64)
    }
}

async fn embed_with(generator: &dyn EmbeddingGenerator, text: &str) -> Result<GeneratedEmbedding> {
    let embedding = generator.embed_text(text).await.map_err(|e| {
        warn!(provider = generator.provider(), model = generator.model(), error = %e, "embedding failed");
        VectorError::embedding(e)
    })?;

    Ok(GeneratedEmbedding {
        dimensions: embedding.len(),
        embedding,
        model: generator.model().to_string(),
    })
}

/// Configuration errors keep their kind; everything else becomes an
/// embedding failure carrying the cause's message.
fn collapse(err: VectorError) -> VectorError {
    match err {
        VectorError::Config(_) | VectorError::EmbeddingFailed(_) => err,
        other => VectorError::embedding(other),
    }
}

#[async_trait]
impl EmbeddingCoordinator for VectorEmbeddings {
    async fn generate_embedding(
        &self,
        text: &str,
        provider: Option<&str>,
    ) -> Result<GeneratedEmbedding> {
        VectorEmbeddings::generate_embedding(self, text, provider).await
    }

    async fn generate_batch_embeddings(
        &self,
        texts: &[String],
        provider: Option<&str>,
    ) -> Result<Vec<EmbeddingResult>> {
        VectorEmbeddings::generate_batch_embeddings(self, texts, provider).await
    }

    async fn store_vector(&self, vector: &NewVector) -> Result<i64> {
        VectorEmbeddings::store_vector(self, vector).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenRegisterConfig;
    use crate::vectors::types::EntityVectorMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text as `[len, 1.0]` and fails for texts containing "fail".
    struct LengthGenerator {
        model: String,
    }

    #[async_trait]
    impl EmbeddingGenerator for LengthGenerator {
        async fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            if text.contains("fail") {
                anyhow::bail!("provider rejected input");
            }
            Ok(vec![text.len() as f32, 1.0])
        }

        fn provider(&self) -> &str {
            "fake"
        }

        fn model(&self) -> &str {
            &self.model
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
    }

    impl GeneratorFactory for CountingFactory {
        fn create(&self, config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingGenerator>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(LengthGenerator {
                model: config.model.clone(),
            }))
        }
    }

    struct BrokenSettings;

    impl SettingsProvider for BrokenSettings {
        fn llm_settings(&self) -> anyhow::Result<crate::config::LlmSettings> {
            anyhow::bail!("settings store offline")
        }
        fn object_settings(&self) -> anyhow::Result<crate::config::ObjectSettings> {
            anyhow::bail!("settings store offline")
        }
        fn file_settings(&self) -> anyhow::Result<crate::config::FileSettings> {
            anyhow::bail!("settings store offline")
        }
        fn solr_settings(&self) -> anyhow::Result<crate::config::SolrSettings> {
            anyhow::bail!("settings store offline")
        }
    }

    fn facade_with(config: OpenRegisterConfig) -> (VectorEmbeddings, Arc<CountingFactory>) {
        let factory = Arc::new(CountingFactory::default());
        let facade = VectorEmbeddings::new(
            db::shared(db::open_memory_database().unwrap()),
            Arc::new(config),
            factory.clone(),
        );
        (facade, factory)
    }

    fn vector(entity_id: &str, model: &str) -> NewVector {
        NewVector {
            metadata: EntityVectorMetadata::new("object", entity_id),
            embedding: vec![1.0, 0.0],
            model: model.into(),
            dimensions: 2,
        }
    }

    #[tokio::test]
    async fn generators_are_cached_per_configuration() {
        let (facade, factory) = facade_with(OpenRegisterConfig::default());
        facade.generate_embedding("a", None).await.unwrap();
        facade.generate_embedding("b", None).await.unwrap();
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);

        let result = facade.generate_embedding("abc", Some("ollama")).await.unwrap();
        assert_eq!(result.model, "nomic-embed-text");
        assert_eq!(result.dimensions, 2);
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    /// OpenAI settings whose API key can be swapped between calls.
    struct RotatingKey {
        key: Mutex<String>,
    }

    impl SettingsProvider for RotatingKey {
        fn llm_settings(&self) -> anyhow::Result<crate::config::LlmSettings> {
            let mut llm = crate::config::LlmSettings::default();
            llm.openai.api_key = Some(self.key.lock().unwrap().clone());
            Ok(llm)
        }
        fn object_settings(&self) -> anyhow::Result<crate::config::ObjectSettings> {
            Ok(Default::default())
        }
        fn file_settings(&self) -> anyhow::Result<crate::config::FileSettings> {
            Ok(Default::default())
        }
        fn solr_settings(&self) -> anyhow::Result<crate::config::SolrSettings> {
            Ok(Default::default())
        }
    }

    #[derive(Default)]
    struct KeyRecordingFactory {
        keys: Mutex<Vec<Option<String>>>,
    }

    impl GeneratorFactory for KeyRecordingFactory {
        fn create(&self, config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingGenerator>> {
            self.keys.lock().unwrap().push(config.api_key.clone());
            Ok(Arc::new(LengthGenerator {
                model: config.model.clone(),
            }))
        }
    }

    #[tokio::test]
    async fn rotated_key_of_same_length_builds_new_generator() {
        let settings = Arc::new(RotatingKey {
            key: Mutex::new("sk-OLDKEY".into()),
        });
        let factory = Arc::new(KeyRecordingFactory::default());
        let facade = VectorEmbeddings::new(
            db::shared(db::open_memory_database().unwrap()),
            settings.clone(),
            factory.clone(),
        );

        facade.generate_embedding("a", None).await.unwrap();
        facade.generate_embedding("b", None).await.unwrap();
        *settings.key.lock().unwrap() = "sk-NEWKEY".into();
        facade.generate_embedding("c", None).await.unwrap();

        assert_eq!(
            *factory.keys.lock().unwrap(),
            vec![Some("sk-OLDKEY".to_string()), Some("sk-NEWKEY".to_string())]
        );
        assert_eq!(facade.generators.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn embedding_failure_is_wrapped_with_cause() {
        let (facade, _) = facade_with(OpenRegisterConfig::default());
        let err = facade.generate_embedding("please fail", None).await.unwrap_err();
        assert!(matches!(err, VectorError::EmbeddingFailed(_)));
        assert_eq!(
            err.to_string(),
            "Embedding generation failed: provider rejected input"
        );
    }

    #[tokio::test]
    async fn batch_reports_failures_per_text() {
        let (facade, _) = facade_with(OpenRegisterConfig::default());
        let texts = vec!["ok".to_string(), "fail here".to_string(), "fine".to_string()];
        let results = facade.generate_batch_embeddings(&texts, None).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].embedding.as_deref(), Some(&[2.0, 1.0][..]));
        assert!(results[1].embedding.is_none());
        assert_eq!(results[1].error.as_deref(), Some("provider rejected input"));
        assert_eq!(results[2].embedding.as_deref(), Some(&[4.0, 1.0][..]));
    }

    #[tokio::test]
    async fn custom_config_is_validated() {
        let (facade, _) = facade_with(OpenRegisterConfig::default());

        let missing_model = CustomEmbeddingConfig {
            provider: Some("ollama".into()),
            ..Default::default()
        };
        let err = facade
            .generate_embedding_with_custom_config("x", &missing_model)
            .await
            .unwrap_err();
        assert!(err.is_config());

        let missing_key = CustomEmbeddingConfig {
            provider: Some("fireworks".into()),
            model: Some("nomic-ai/nomic-embed-text-v1.5".into()),
            api_key: Some("  ".into()),
            base_url: None,
        };
        let err = facade
            .generate_embedding_with_custom_config("x", &missing_key)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key"));

        let ollama = CustomEmbeddingConfig {
            provider: Some("ollama".into()),
            model: Some("mxbai-embed-large".into()),
            ..Default::default()
        };
        let ok = facade
            .generate_embedding_with_custom_config("xyz", &ollama)
            .await
            .unwrap();
        assert_eq!(ok.model, "mxbai-embed-large");
    }

    #[tokio::test]
    async fn backend_falls_back_to_local_when_settings_fail() {
        let facade = VectorEmbeddings::new(
            db::shared(db::open_memory_database().unwrap()),
            Arc::new(BrokenSettings),
            Arc::new(CountingFactory::default()),
        );
        let backend = facade.active_backend().unwrap();
        assert_eq!(backend.name(), "local");

        let id = facade.store_vector(&vector("1", "m")).await.unwrap();
        assert!(id > 0);
    }

    #[test]
    fn backend_kind_follows_settings() {
        let mut config = OpenRegisterConfig::default();
        config.llm.vector_backend = "solr".into();
        let (facade, _) = facade_with(config);
        assert_eq!(facade.backend_kind().unwrap(), VectorBackend::Solr);

        let broken = VectorEmbeddings::new(
            db::shared(db::open_memory_database().unwrap()),
            Arc::new(BrokenSettings),
            Arc::new(CountingFactory::default()),
        );
        assert_eq!(broken.backend_kind().unwrap(), VectorBackend::Local);
    }

    #[tokio::test]
    async fn unknown_backend_is_a_config_error() {
        let mut config = OpenRegisterConfig::default();
        config.llm.vector_backend = "redis".into();
        let (facade, _) = facade_with(config);
        assert!(facade.store_vector(&vector("1", "m")).await.unwrap_err().is_config());
    }

    #[tokio::test]
    async fn semantic_search_finds_stored_vector() {
        let (facade, _) = facade_with(OpenRegisterConfig::default());
        let embedded = facade.generate_embedding("permit", None).await.unwrap();
        facade
            .store_vector(&NewVector {
                metadata: EntityVectorMetadata::new("object", "9"),
                dimensions: embedded.dimensions,
                embedding: embedded.embedding,
                model: embedded.model,
            })
            .await
            .unwrap();

        let hits = facade
            .semantic_search("permit", DEFAULT_SEMANTIC_LIMIT, &SearchFilters::default(), None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_id, "9");
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);

        let hybrid = facade
            .hybrid_search(
                "permit",
                &[KeywordHit { entity_type: "object".into(), entity_id: "9".into(), score: 3.0 }],
                DEFAULT_HYBRID_LIMIT,
                HybridWeights::default(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(hybrid.total, 1);
        assert_eq!(hybrid.source_breakdown.both, 1);
    }

    #[tokio::test]
    async fn mismatch_with_no_vectors() {
        let (facade, _) = facade_with(OpenRegisterConfig::default());
        let report = facade.check_embedding_model_mismatch();
        assert!(!report.has_vectors);
        assert!(!report.mismatch);
        assert_eq!(report.current_model.as_deref(), Some("text-embedding-ada-002"));
        assert_eq!(report.message, "No vectors exist yet");
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn mismatch_detects_other_and_mixed_models() {
        let (facade, _) = facade_with(OpenRegisterConfig::default());
        facade.store_vector(&vector("1", "text-embedding-ada-002")).await.unwrap();
        assert!(!facade.check_embedding_model_mismatch().mismatch);

        facade.store_vector(&vector("2", "nomic-embed-text")).await.unwrap();
        let report = facade.check_embedding_model_mismatch();
        assert!(report.has_vectors);
        assert!(report.mismatch);
        assert_eq!(report.existing_models.len(), 2);
        assert_eq!(report.total_vectors, 2);
    }

    #[test]
    fn mismatch_check_swallows_errors() {
        let facade = VectorEmbeddings::new(
            db::shared(db::open_memory_database().unwrap()),
            Arc::new(BrokenSettings),
            Arc::new(CountingFactory::default()),
        );
        let report = facade.check_embedding_model_mismatch();
        assert!(!report.has_vectors);
        assert!(!report.mismatch);
        assert!(report.error.unwrap().contains("settings store offline"));
    }

    #[tokio::test]
    async fn clear_reports_deleted_count() {
        let (facade, _) = facade_with(OpenRegisterConfig::default());
        assert_eq!(facade.clear_all_embeddings().deleted, 0);

        facade.store_vector(&vector("1", "m")).await.unwrap();
        facade.store_vector(&vector("2", "m")).await.unwrap();
        let result = facade.clear_all_embeddings();
        assert!(result.success);
        assert_eq!(result.deleted, 2);
        assert_eq!(facade.get_stats().await.unwrap().total_vectors, 0);
    }
}
