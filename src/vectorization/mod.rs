//! Batch vectorization: strategy registry and orchestrator.
//!
//! [`VectorizationService::vectorize_batch`] looks up the strategy for an
//! entity type, fetches entities, extracts text items from each, embeds them
//! (one call per item, or in batch calls of `batch_size`) and stores the
//! resulting vectors. Item and entity failures are collected in the returned
//! [`BatchVectorizationResult`]; only a missing strategy or a failed fetch
//! fails the call.

pub mod chunking;
pub mod file;
pub mod object;
pub mod strategy;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::SettingsProvider;
use crate::error::{Result, VectorError};
use crate::register::RegisterStore;
use crate::vectors::types::{EmbeddingResult, GeneratedEmbedding, NewVector};
use file::{FileVectorizationStrategy, FILE_ENTITY_TYPE};
use object::{ObjectVectorizationStrategy, OBJECT_ENTITY_TYPE};
use strategy::{Entity, ProcessingMode, VectorizationItem, VectorizationStrategy, VectorizeOptions};

/// The embedding and storage calls the orchestrator depends on.
#[async_trait]
pub trait EmbeddingCoordinator: Send + Sync {
    async fn generate_embedding(
        &self,
        text: &str,
        provider: Option<&str>,
    ) -> Result<GeneratedEmbedding>;

    /// One result per text, in input order.
    async fn generate_batch_embeddings(
        &self,
        texts: &[String],
        provider: Option<&str>,
    ) -> Result<Vec<EmbeddingResult>>;

    async fn store_vector(&self, vector: &NewVector) -> Result<i64>;
}

/// A failure recorded during a batch. `item_index` is `None` when the whole
/// entity failed before any item was processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemError {
    pub entity_id: String,
    pub item_index: Option<usize>,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchVectorizationResult {
    pub success: bool,
    pub entity_type: String,
    pub total_entities: usize,
    pub total_items: usize,
    pub vectorized: usize,
    pub failed: usize,
    pub errors: Vec<ItemError>,
}

impl BatchVectorizationResult {
    fn new(entity_type: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            ..Default::default()
        }
    }

    fn item_failed(&mut self, entity_id: &str, item_index: usize, error: impl Into<String>) {
        let error = error.into();
        warn!(entity_id = %entity_id, item_index, error = %error, "vectorization item failed");
        self.failed += 1;
        self.errors.push(ItemError {
            entity_id: entity_id.to_string(),
            item_index: Some(item_index),
            error,
        });
    }
}

/// Strategies keyed by entity type. Registering a type twice replaces the
/// earlier strategy.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn VectorizationStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Object and file strategies over the SQLite register.
    pub fn with_register(store: Arc<RegisterStore>, settings: Arc<dyn SettingsProvider>) -> Self {
        let mut registry = Self::new();
        registry.register(
            OBJECT_ENTITY_TYPE,
            Arc::new(ObjectVectorizationStrategy::new(store.clone(), settings.clone())),
        );
        registry.register(
            FILE_ENTITY_TYPE,
            Arc::new(FileVectorizationStrategy::new(store, settings)),
        );
        registry
    }

    pub fn register(&mut self, entity_type: &str, strategy: Arc<dyn VectorizationStrategy>) {
        if self
            .strategies
            .insert(entity_type.to_string(), strategy)
            .is_some()
        {
            debug!(entity_type = %entity_type, "strategy replaced");
        }
    }

    pub fn get(&self, entity_type: &str) -> Option<Arc<dyn VectorizationStrategy>> {
        self.strategies.get(entity_type).cloned()
    }

    pub fn entity_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.strategies.keys().cloned().collect();
        types.sort();
        types
    }
}

pub struct VectorizationService {
    registry: StrategyRegistry,
    embeddings: Arc<dyn EmbeddingCoordinator>,
}

impl VectorizationService {
    pub fn new(registry: StrategyRegistry, embeddings: Arc<dyn EmbeddingCoordinator>) -> Self {
        Self {
            registry,
            embeddings,
        }
    }

    pub fn register_strategy(&mut self, entity_type: &str, strategy: Arc<dyn VectorizationStrategy>) {
        self.registry.register(entity_type, strategy);
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Vectorize one batch of `entity_type` entities.
    pub async fn vectorize_batch(
        &self,
        entity_type: &str,
        options: &VectorizeOptions,
    ) -> Result<BatchVectorizationResult> {
        let strategy = self
            .registry
            .get(entity_type)
            .ok_or_else(|| VectorError::StrategyNotFound(entity_type.to_string()))?;

        info!(
            entity_type = %entity_type,
            mode = ?options.mode,
            batch_size = options.batch_size,
            limit = options.limit,
            "starting batch vectorization"
        );

        let entities = strategy.fetch_entities(options)?;
        let mut result = BatchVectorizationResult::new(entity_type);
        result.total_entities = entities.len();

        if entities.is_empty() {
            info!(entity_type = %entity_type, "no entities to vectorize");
            result.success = true;
            return Ok(result);
        }

        for entity in &entities {
            if let Err(e) = self
                .vectorize_entity(strategy.as_ref(), entity, options, &mut result)
                .await
            {
                let entity_id = strategy.entity_identifier(entity);
                error!(entity_type = %entity_type, entity_id = %entity_id, error = %e, "entity vectorization failed");
                result.errors.push(ItemError {
                    entity_id,
                    item_index: None,
                    error: e.to_string(),
                });
            }
        }

        result.success = true;
        info!(
            entity_type = %entity_type,
            entities = result.total_entities,
            items = result.total_items,
            vectorized = result.vectorized,
            failed = result.failed,
            "batch vectorization finished"
        );
        Ok(result)
    }

    async fn vectorize_entity(
        &self,
        strategy: &dyn VectorizationStrategy,
        entity: &Entity,
        options: &VectorizeOptions,
        result: &mut BatchVectorizationResult,
    ) -> anyhow::Result<()> {
        let items = strategy.extract_vectorization_items(entity)?;
        if items.is_empty() {
            return Ok(());
        }
        result.total_items += items.len();

        let batched = options.mode == ProcessingMode::Parallel
            && options.batch_size > 1
            && items.len() > 1;

        if batched {
            self.process_batched(strategy, entity, &items, options, result).await;
        } else {
            self.process_serial(strategy, entity, &items, options, result).await;
        }
        Ok(())
    }

    async fn process_serial(
        &self,
        strategy: &dyn VectorizationStrategy,
        entity: &Entity,
        items: &[VectorizationItem],
        options: &VectorizeOptions,
        result: &mut BatchVectorizationResult,
    ) {
        let entity_id = strategy.entity_identifier(entity);
        let provider = options.provider.as_deref();

        for item in items {
            let outcome = match self.embeddings.generate_embedding(&item.text, provider).await {
                Ok(generated) => {
                    self.store(strategy, entity, item, generated.embedding, generated.model)
                        .await
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(_) => result.vectorized += 1,
                Err(e) => result.item_failed(&entity_id, item.index, e.to_string()),
            }
        }
    }

    /// Embed items in groups of `batch_size`. Result `i` of a batch call
    /// belongs to item `i` of the group; a failed call fails the whole group.
    async fn process_batched(
        &self,
        strategy: &dyn VectorizationStrategy,
        entity: &Entity,
        items: &[VectorizationItem],
        options: &VectorizeOptions,
        result: &mut BatchVectorizationResult,
    ) {
        let entity_id = strategy.entity_identifier(entity);
        let provider = options.provider.as_deref();

        for group in items.chunks(options.batch_size) {
            let texts: Vec<String> = group.iter().map(|item| item.text.clone()).collect();

            let embeddings = match self.embeddings.generate_batch_embeddings(&texts, provider).await {
                Ok(embeddings) => embeddings,
                Err(e) => {
                    let message = e.to_string();
                    for item in group {
                        result.item_failed(&entity_id, item.index, message.clone());
                    }
                    continue;
                }
            };

            for (position, item) in group.iter().enumerate() {
                let Some(embedded) = embeddings.get(position) else {
                    result.item_failed(
                        &entity_id,
                        item.index,
                        format!("No embedding result returned for batch position {position}"),
                    );
                    continue;
                };

                let Some(vector) = embedded.embedding.clone() else {
                    let message = embedded.error.clone().unwrap_or_else(|| {
                        format!("No embedding generated for item {}", item.index)
                    });
                    result.item_failed(&entity_id, item.index, message);
                    continue;
                };

                match self
                    .store(strategy, entity, item, vector, embedded.model.clone())
                    .await
                {
                    Ok(_) => result.vectorized += 1,
                    Err(e) => result.item_failed(&entity_id, item.index, e.to_string()),
                }
            }
        }
    }

    async fn store(
        &self,
        strategy: &dyn VectorizationStrategy,
        entity: &Entity,
        item: &VectorizationItem,
        embedding: Vec<f32>,
        model: String,
    ) -> Result<i64> {
        let vector = NewVector {
            metadata: strategy.prepare_vector_metadata(entity, item),
            dimensions: embedding.len(),
            embedding,
            model,
        };
        self.embeddings.store_vector(&vector).await
    }
}
