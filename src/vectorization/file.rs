//! Vectorization of files with extracted text: one embedding per chunk.

use anyhow::Result;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::chunking::{chunk_text, ChunkConfig};
use super::strategy::{
    Entity, VectorizationItem, VectorizationStrategy, VectorizeOptions, DEFAULT_LIMIT,
};
use crate::config::{FileSettings, SettingsProvider};
use crate::register::{FileQuery, FileSource};
use crate::vectors::types::{truncate_preview, EntityVectorMetadata, CHUNK_PREVIEW_CHARS};

pub const FILE_ENTITY_TYPE: &str = "file";

pub struct FileVectorizationStrategy {
    source: Arc<dyn FileSource>,
    settings: Arc<dyn SettingsProvider>,
}

impl FileVectorizationStrategy {
    pub fn new(source: Arc<dyn FileSource>, settings: Arc<dyn SettingsProvider>) -> Self {
        Self { source, settings }
    }

    fn file_settings(&self) -> FileSettings {
        self.settings.file_settings().unwrap_or_else(|e| {
            warn!(error = %e, "file settings unavailable, using defaults");
            FileSettings::default()
        })
    }
}

impl VectorizationStrategy for FileVectorizationStrategy {
    fn fetch_entities(&self, options: &VectorizeOptions) -> Result<Vec<Entity>> {
        let settings = self.file_settings();
        let query = FileQuery {
            limit: if options.limit == 0 { DEFAULT_LIMIT } else { options.limit },
            offset: options.offset,
            mime_types: settings.allowed_mime_types,
        };

        let files = self.source.extracted_files(&query)?;
        debug!(count = files.len(), "files fetched for vectorization");
        Ok(files.iter().map(Entity::from).collect())
    }

    fn extract_vectorization_items(&self, entity: &Entity) -> Result<Vec<VectorizationItem>> {
        let Some(text) = entity.data.get("text").and_then(Value::as_str) else {
            return Ok(Vec::new());
        };

        let config = ChunkConfig::from(&self.file_settings());
        let chunks = chunk_text(text, &config);
        let total = chunks.len();

        Ok(chunks
            .into_iter()
            .map(|chunk| {
                let mut item = VectorizationItem::new(chunk.text, chunk.index);
                item.extra.insert("total_chunks".into(), json!(total));
                item.extra.insert("start_offset".into(), json!(chunk.start_offset));
                item.extra.insert("end_offset".into(), json!(chunk.end_offset));
                item
            })
            .collect())
    }

    fn prepare_vector_metadata(
        &self,
        entity: &Entity,
        item: &VectorizationItem,
    ) -> EntityVectorMetadata {
        let entity_id = self.entity_identifier(entity);
        let total_chunks = item
            .extra
            .get("total_chunks")
            .and_then(Value::as_u64)
            .map_or(1, |n| n as usize)
            .max(item.index + 1);
        let meta = |key: &str| entity.meta_str(key).map_or(Value::Null, |v| json!(v));

        let mut additional = Map::new();
        additional.insert("file_id".into(), json!(entity_id));
        additional.insert("file_name".into(), meta("name"));
        additional.insert("file_path".into(), meta("path"));
        additional.insert("mime_type".into(), meta("mime_type"));

        EntityVectorMetadata {
            entity_type: FILE_ENTITY_TYPE.to_string(),
            entity_id,
            chunk_index: item.index,
            total_chunks,
            chunk_text: Some(truncate_preview(&item.text, CHUNK_PREVIEW_CHARS)),
            additional_metadata: additional,
        }
    }
}
