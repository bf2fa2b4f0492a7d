//! Vectorization of register objects: one embedding per object.

use anyhow::Result;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::strategy::{
    entity_description, entity_title, Entity, VectorizationItem, VectorizationStrategy,
    VectorizeOptions, DEFAULT_LIMIT,
};
use crate::config::{ObjectSettings, SettingsProvider};
use crate::register::{ObjectQuery, ObjectSearch, ObjectSource};
use crate::vectors::types::{truncate_preview, EntityVectorMetadata, CHUNK_PREVIEW_CHARS};

pub const OBJECT_ENTITY_TYPE: &str = "object";

/// Bookkeeping keys written as header lines when metadata is included.
const HEADER_KEYS: &[&str] = &["uuid", "register", "schema", "name"];

pub struct ObjectVectorizationStrategy {
    source: Arc<dyn ObjectSource>,
    settings: Arc<dyn SettingsProvider>,
}

impl ObjectVectorizationStrategy {
    pub fn new(source: Arc<dyn ObjectSource>, settings: Arc<dyn SettingsProvider>) -> Self {
        Self { source, settings }
    }

    fn object_settings(&self) -> ObjectSettings {
        self.settings.object_settings().unwrap_or_else(|e| {
            warn!(error = %e, "object settings unavailable, using defaults");
            ObjectSettings::default()
        })
    }
}

impl VectorizationStrategy for ObjectVectorizationStrategy {
    fn fetch_entities(&self, options: &VectorizeOptions) -> Result<Vec<Entity>> {
        let settings = self.object_settings();

        let views = if !options.views.is_empty() {
            options.views.clone()
        } else if !settings.vectorize_all_views {
            settings.enabled_views.clone()
        } else {
            Vec::new()
        };

        let query = ObjectQuery {
            limit: if options.limit == 0 { DEFAULT_LIMIT } else { options.limit },
            offset: options.offset,
            views,
            register: options.register.clone(),
            schema: options.schema.clone(),
            count_only: false,
        };

        match self.source.search_objects(&query)? {
            ObjectSearch::Objects(objects) => {
                debug!(count = objects.len(), views = ?query.views, "objects fetched for vectorization");
                Ok(objects.iter().map(Entity::from).collect())
            }
            ObjectSearch::Count(count) => {
                warn!(count, "object source answered with a count, treating as no results");
                Ok(Vec::new())
            }
        }
    }

    fn extract_vectorization_items(&self, entity: &Entity) -> Result<Vec<VectorizationItem>> {
        let text = serialize_object(entity, &self.object_settings());
        if text.trim().is_empty() {
            debug!(entity_id = %self.entity_identifier(entity), "object has no text to vectorize");
            return Ok(Vec::new());
        }
        Ok(vec![VectorizationItem::new(text, 0)])
    }

    fn prepare_vector_metadata(
        &self,
        entity: &Entity,
        item: &VectorizationItem,
    ) -> EntityVectorMetadata {
        let entity_id = self.entity_identifier(entity);
        let meta = |key: &str| entity.meta_str(key).map_or(Value::Null, |v| json!(v));

        let mut additional = Map::new();
        additional.insert("object_id".into(), json!(entity_id));
        additional.insert("uuid".into(), meta("uuid"));
        additional.insert("register".into(), meta("register"));
        additional.insert("schema".into(), meta("schema"));
        additional.insert("title".into(), json!(entity_title(entity)));
        additional.insert("description".into(), json!(entity_description(entity)));

        EntityVectorMetadata {
            entity_type: OBJECT_ENTITY_TYPE.to_string(),
            entity_id,
            chunk_index: 0,
            total_chunks: 1,
            chunk_text: Some(truncate_preview(&item.text, CHUNK_PREVIEW_CHARS)),
            additional_metadata: additional,
        }
    }
}

/// Render an object as `path: value` lines.
pub fn serialize_object(entity: &Entity, settings: &ObjectSettings) -> String {
    let mut lines = Vec::new();

    if settings.include_metadata {
        for key in HEADER_KEYS {
            if let Some(value) = entity.meta_str(key).filter(|v| !v.is_empty()) {
                lines.push(format!("{key}: {value}"));
            }
        }
    }

    flatten_map(&entity.data, "", 0, settings, &mut lines);
    lines.join("\n")
}

fn flatten_map(
    map: &Map<String, Value>,
    prefix: &str,
    depth: usize,
    settings: &ObjectSettings,
    out: &mut Vec<String>,
) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        flatten_value(&path, value, depth, settings, out);
    }
}

fn flatten_value(
    path: &str,
    value: &Value,
    depth: usize,
    settings: &ObjectSettings,
    out: &mut Vec<String>,
) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            if depth < settings.max_nesting_depth {
                flatten_map(map, path, depth + 1, settings, out);
            }
        }
        Value::Array(items) if items.iter().all(is_scalar) => {
            let rendered: Vec<String> = items
                .iter()
                .filter_map(|item| scalar_text(item, settings))
                .collect();
            if !rendered.is_empty() {
                out.push(format!("{path}: {}", rendered.join(", ")));
            }
        }
        Value::Array(items) => {
            if depth < settings.max_nesting_depth {
                for (i, item) in items.iter().enumerate() {
                    flatten_value(&format!("{path}[{i}]"), item, depth + 1, settings, out);
                }
            }
        }
        scalar => {
            if let Some(text) = scalar_text(scalar, settings) {
                out.push(format!("{path}: {text}"));
            }
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// Text of a scalar, or `None` for nulls, blanks and (when relations are
/// excluded) UUID references.
fn scalar_text(value: &Value, settings: &ObjectSettings) -> Option<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) if !settings.include_relations && is_uuid_reference(s) => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_uuid_reference(value: &str) -> bool {
    uuid::Uuid::parse_str(value.trim()).is_ok()
}
