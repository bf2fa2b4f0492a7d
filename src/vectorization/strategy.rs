//! The per-entity-type adapter the batch orchestrator drives.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::register::{FileRecord, ObjectRecord};
use crate::vectors::types::EntityVectorMetadata;

/// Default number of entities fetched per batch.
pub const DEFAULT_LIMIT: usize = 100;
/// Default number of texts submitted per batch embedding call.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Identifier used when an entity carries no id.
pub const UNKNOWN_ENTITY_ID: &str = "unknown";

/// Canonical record every strategy works on, whatever shape the source
/// delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: Option<String>,
    /// Bookkeeping about the entity (uuid, register, schema, name, ...).
    pub meta: Map<String, Value>,
    /// The entity's own properties.
    pub data: Map<String, Value>,
}

impl Entity {
    /// Normalise a raw map: `id` at the top level, bookkeeping under `@self`,
    /// properties under `object` or else the remaining keys.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let meta = map
            .get("@self")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let id = id_string(map.get("id")).or_else(|| id_string(meta.get("id")));

        let data = match map.get("object") {
            Some(Value::Object(object)) => object.clone(),
            _ => map
                .iter()
                .filter(|(k, _)| !matches!(k.as_str(), "id" | "@self"))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        Self { id, meta, data }
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }
}

fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn insert_opt(meta: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        meta.insert(key.to_string(), Value::String(value.to_string()));
    }
}

impl From<&ObjectRecord> for Entity {
    fn from(record: &ObjectRecord) -> Self {
        let mut meta = Map::new();
        meta.insert("uuid".into(), Value::String(record.uuid.clone()));
        insert_opt(&mut meta, "register", record.register.as_deref());
        insert_opt(&mut meta, "schema", record.schema.as_deref());
        insert_opt(&mut meta, "name", record.name.as_deref());
        insert_opt(&mut meta, "description", record.description.as_deref());
        meta.insert("created".into(), Value::String(record.created.clone()));
        meta.insert("updated".into(), Value::String(record.updated.clone()));

        Self {
            id: Some(record.id.to_string()),
            meta,
            data: record.object.clone(),
        }
    }
}

impl From<&FileRecord> for Entity {
    fn from(record: &FileRecord) -> Self {
        let mut meta = Map::new();
        meta.insert("name".into(), Value::String(record.name.clone()));
        meta.insert("path".into(), Value::String(record.path.clone()));
        insert_opt(&mut meta, "mime_type", record.mime_type.as_deref());
        meta.insert("size".into(), Value::from(record.size));

        let mut data = Map::new();
        insert_opt(&mut data, "text", record.extracted_text.as_deref());

        Self {
            id: Some(record.id.to_string()),
            meta,
            data,
        }
    }
}

/// One text unit to embed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorizationItem {
    pub text: String,
    /// Position of the item within its entity.
    pub index: usize,
    /// Strategy-specific details (chunk offsets, totals).
    pub extra: Map<String, Value>,
}

impl VectorizationItem {
    pub fn new(text: impl Into<String>, index: usize) -> Self {
        Self {
            text: text.into(),
            index,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// One embedding call per item.
    #[default]
    Serial,
    /// Items grouped into batch embedding calls of `batch_size`.
    Parallel,
}

impl std::str::FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(Self::Serial),
            "parallel" => Ok(Self::Parallel),
            other => Err(format!("unknown processing mode: {other}")),
        }
    }
}

/// Options for one `vectorize_batch` run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorizeOptions {
    pub mode: ProcessingMode,
    pub batch_size: usize,
    pub limit: usize,
    /// Entities to skip, so successive runs can page through the source.
    pub offset: usize,
    /// View ids. Empty means the configured views (or all).
    pub views: Vec<String>,
    pub register: Option<String>,
    pub schema: Option<String>,
    /// Embedding provider override.
    pub provider: Option<String>,
}

impl Default for VectorizeOptions {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::Serial,
            batch_size: DEFAULT_BATCH_SIZE,
            limit: DEFAULT_LIMIT,
            offset: 0,
            views: Vec::new(),
            register: None,
            schema: None,
            provider: None,
        }
    }
}

/// Adapter between one entity type and the batch orchestrator.
pub trait VectorizationStrategy: Send + Sync {
    /// Entities to vectorize. An empty vec means nothing to do.
    fn fetch_entities(&self, options: &VectorizeOptions) -> Result<Vec<Entity>>;

    /// Text units for one entity, in the order they should be embedded.
    fn extract_vectorization_items(&self, entity: &Entity) -> Result<Vec<VectorizationItem>>;

    /// Metadata stored with the vector of `item`. Must not fail and must not
    /// depend on anything but its arguments.
    fn prepare_vector_metadata(
        &self,
        entity: &Entity,
        item: &VectorizationItem,
    ) -> EntityVectorMetadata;

    /// Stable identifier of the entity, `"unknown"` when it has none.
    fn entity_identifier(&self, entity: &Entity) -> String {
        entity
            .id
            .clone()
            .unwrap_or_else(|| UNKNOWN_ENTITY_ID.to_string())
    }
}

/// One step of the title/description lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// A key of the entity's bookkeeping map.
    Meta(&'static str),
    /// A key of the entity's properties.
    Data(&'static str),
    /// The first string property whose length is within the bounds.
    FirstShortString { min: usize, max: usize },
}

/// Title lookup, tried in order.
pub const TITLE_RULES: &[FieldRule] = &[
    FieldRule::Meta("name"),
    FieldRule::Data("title"),
    FieldRule::Data("name"),
    FieldRule::Data("label"),
    FieldRule::Data("subject"),
    FieldRule::Data("summary"),
    FieldRule::FirstShortString { min: 1, max: 100 },
];

/// Description lookup, tried in order.
pub const DESCRIPTION_RULES: &[FieldRule] = &[
    FieldRule::Meta("description"),
    FieldRule::Data("description"),
    FieldRule::Data("summary"),
    FieldRule::Data("body"),
    FieldRule::Data("content"),
];

impl FieldRule {
    pub fn apply<'a>(&self, entity: &'a Entity) -> Option<&'a str> {
        let non_blank = |v: &'a Value| v.as_str().filter(|s| !s.trim().is_empty());
        match *self {
            Self::Meta(key) => entity.meta.get(key).and_then(non_blank),
            Self::Data(key) => entity.data.get(key).and_then(non_blank),
            Self::FirstShortString { min, max } => entity.data.values().find_map(|v| {
                let s = non_blank(v)?;
                let len = s.chars().count();
                (min..=max).contains(&len).then_some(s)
            }),
        }
    }
}

/// First rule that yields a value.
pub fn first_match<'a>(rules: &[FieldRule], entity: &'a Entity) -> Option<&'a str> {
    rules.iter().find_map(|rule| rule.apply(entity))
}

/// Entity title, falling back to `Object #<id>`.
pub fn entity_title(entity: &Entity) -> String {
    first_match(TITLE_RULES, entity)
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "Object #{}",
                entity.id.as_deref().unwrap_or(UNKNOWN_ENTITY_ID)
            )
        })
}

/// Entity description, empty when nothing matches.
pub fn entity_description(entity: &Entity) -> String {
    first_match(DESCRIPTION_RULES, entity)
        .map(str::to_string)
        .unwrap_or_default()
}
