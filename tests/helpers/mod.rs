#![allow(dead_code)]

use async_trait::async_trait;
use openregister::config::OpenRegisterConfig;
use openregister::db::{self, SharedConnection};
use openregister::embedding::{EmbeddingConfig, EmbeddingGenerator, GeneratorFactory};
use openregister::error::{Result, VectorError};
use openregister::vectorization::strategy::{
    Entity, VectorizationItem, VectorizationStrategy, VectorizeOptions, UNKNOWN_ENTITY_ID,
};
use openregister::vectorization::EmbeddingCoordinator;
use openregister::vectors::types::{
    EmbeddingResult, EntityVectorMetadata, GeneratedEmbedding, NewVector,
};
use openregister::vectors::VectorEmbeddings;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DIMENSIONS: usize = 16;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> SharedConnection {
    db::shared(db::open_memory_database().unwrap())
}

/// Deterministic unit-length embedding derived from a hash of the text.
/// Equal texts give equal vectors.
pub fn hash_embedding(text: &str) -> Vec<f32> {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let hash = hasher.finish();

    let mut v: Vec<f32> = (0..DIMENSIONS)
        .map(|i| if (hash >> (i * 4)) & 1 == 1 { 1.0 } else { -0.5 })
        .collect();
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in &mut v {
        *x /= norm;
    }
    v
}

/// Config using Ollama so no API key is needed.
pub fn test_config() -> OpenRegisterConfig {
    let mut config = OpenRegisterConfig::default();
    config.llm.embedding_provider = "ollama".into();
    config
}

/// Generator that hashes text and fails for any text containing a marker.
pub struct FakeGenerator {
    model: String,
    fail_marker: Option<String>,
}

#[async_trait]
impl EmbeddingGenerator for FakeGenerator {
    async fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                anyhow::bail!("fake provider refused text");
            }
        }
        Ok(hash_embedding(text))
    }

    fn provider(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Default)]
pub struct FakeFactory {
    pub fail_marker: Option<String>,
    pub created: AtomicUsize,
}

impl GeneratorFactory for FakeFactory {
    fn create(&self, config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingGenerator>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeGenerator {
            model: config.model.clone(),
            fail_marker: self.fail_marker.clone(),
        }))
    }
}

/// Facade over `db` with the fake generator factory.
pub fn facade(db: SharedConnection, config: OpenRegisterConfig) -> Arc<VectorEmbeddings> {
    Arc::new(VectorEmbeddings::new(
        db,
        Arc::new(config),
        Arc::new(FakeFactory::default()),
    ))
}

/// Strategy serving fixed entities, counting every call it receives.
pub struct ScriptedStrategy {
    pub entities: Vec<Entity>,
    pub items_per_entity: usize,
    /// Entities whose extraction fails.
    pub failing_entities: HashSet<String>,
    pub calls: AtomicUsize,
}

impl ScriptedStrategy {
    pub fn new(entity_count: usize, items_per_entity: usize) -> Self {
        let entities = (0..entity_count)
            .map(|i| Entity {
                id: Some(format!("entity-{i}")),
                ..Default::default()
            })
            .collect();
        Self {
            entities,
            items_per_entity,
            failing_entities: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VectorizationStrategy for ScriptedStrategy {
    fn fetch_entities(&self, _: &VectorizeOptions) -> anyhow::Result<Vec<Entity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entities.clone())
    }

    fn extract_vectorization_items(&self, entity: &Entity) -> anyhow::Result<Vec<VectorizationItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = self.entity_identifier(entity);
        if self.failing_entities.contains(&id) {
            anyhow::bail!("cannot read {id}");
        }
        Ok((0..self.items_per_entity)
            .map(|i| VectorizationItem::new(format!("{id} item {i}"), i))
            .collect())
    }

    fn prepare_vector_metadata(
        &self,
        entity: &Entity,
        item: &VectorizationItem,
    ) -> EntityVectorMetadata {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut metadata = EntityVectorMetadata::new("scripted", self.entity_identifier(entity));
        metadata.chunk_index = item.index;
        metadata.total_chunks = self.items_per_entity.max(item.index + 1);
        metadata.chunk_text = Some(item.text.clone());
        metadata
    }

    fn entity_identifier(&self, entity: &Entity) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        entity.id.clone().unwrap_or_else(|| UNKNOWN_ENTITY_ID.to_string())
    }
}

/// Coordinator with scripted failures that records what it stores.
#[derive(Default)]
pub struct ScriptedCoordinator {
    /// Texts whose single embedding call fails.
    pub failing_texts: HashSet<String>,
    /// Zero-based batch call numbers that fail as a whole.
    pub failing_batch_calls: HashSet<usize>,
    /// Texts that come back from a batch call without an embedding.
    pub missing_in_batch: HashSet<String>,
    pub batch_calls: AtomicUsize,
    pub single_calls: AtomicUsize,
    pub stored: Mutex<Vec<NewVector>>,
}

impl ScriptedCoordinator {
    pub fn stored(&self) -> Vec<NewVector> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingCoordinator for ScriptedCoordinator {
    async fn generate_embedding(
        &self,
        text: &str,
        _provider: Option<&str>,
    ) -> Result<GeneratedEmbedding> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_texts.contains(text) {
            return Err(VectorError::embedding("provider timed out"));
        }
        Ok(GeneratedEmbedding {
            embedding: hash_embedding(text),
            model: "scripted-model".into(),
            dimensions: DIMENSIONS,
        })
    }

    async fn generate_batch_embeddings(
        &self,
        texts: &[String],
        _provider: Option<&str>,
    ) -> Result<Vec<EmbeddingResult>> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_batch_calls.contains(&call) {
            return Err(VectorError::embedding("batch request rejected"));
        }
        Ok(texts
            .iter()
            .map(|text| {
                if self.missing_in_batch.contains(text) {
                    EmbeddingResult::failure("scripted-model", "model returned no vector")
                } else {
                    EmbeddingResult::success(hash_embedding(text), "scripted-model")
                }
            })
            .collect())
    }

    async fn store_vector(&self, vector: &NewVector) -> Result<i64> {
        let mut stored = self.stored.lock().unwrap();
        stored.push(vector.clone());
        Ok(stored.len() as i64)
    }
}
