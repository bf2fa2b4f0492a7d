//! Value types shared by the embedding facade, the vector backends and the
//! vectorization pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Longest chunk preview kept next to a stored vector.
pub const CHUNK_PREVIEW_CHARS: usize = 500;

/// Where a stored vector came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityVectorMetadata {
    pub entity_type: String,
    pub entity_id: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Truncated preview of the embedded text.
    pub chunk_text: Option<String>,
    pub additional_metadata: Map<String, Value>,
}

impl EntityVectorMetadata {
    /// Metadata for a single-chunk entity.
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            chunk_index: 0,
            total_chunks: 1,
            chunk_text: None,
            additional_metadata: Map::new(),
        }
    }
}

/// A successful embedding of one text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedEmbedding {
    pub embedding: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
}

/// Ad hoc generator configuration, used to test connectivity without touching
/// the persisted settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomEmbeddingConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Per-text outcome of a batch embedding call. Exactly one of `embedding`
/// and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingResult {
    pub embedding: Option<Vec<f32>>,
    pub model: String,
    pub dimensions: usize,
    pub error: Option<String>,
}

impl EmbeddingResult {
    pub fn success(embedding: Vec<f32>, model: impl Into<String>) -> Self {
        let dimensions = embedding.len();
        Self {
            embedding: Some(embedding),
            model: model.into(),
            dimensions,
            error: None,
        }
    }

    pub fn failure(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            embedding: None,
            model: model.into(),
            dimensions: 0,
            error: Some(error.into()),
        }
    }
}

/// A vector ready to be written to a backend.
#[derive(Debug, Clone)]
pub struct NewVector {
    pub metadata: EntityVectorMetadata,
    pub embedding: Vec<f32>,
    pub model: String,
    pub dimensions: usize,
}

/// Restrictions applied to the vector side of a search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_ids: Vec<String>,
}

/// One nearest-neighbour match.
#[derive(Debug, Clone, Serialize)]
pub struct VectorHit {
    pub vector_id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub chunk_text: Option<String>,
    /// Cosine similarity in `[-1, 1]`, higher is closer.
    pub similarity: f64,
    pub model: Option<String>,
    pub metadata: Map<String, Value>,
}

/// A pre-fetched keyword (Solr / BM25) match handed to hybrid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordHit {
    pub entity_type: String,
    pub entity_id: String,
    pub score: f64,
}

/// Blend weights for hybrid search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridWeights {
    pub solr: f64,
    pub vector: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            solr: 0.5,
            vector: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HybridHit {
    pub entity_type: String,
    pub entity_id: String,
    pub chunk_text: Option<String>,
    pub vector_score: Option<f64>,
    pub keyword_score: Option<f64>,
    pub combined_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceBreakdown {
    pub vector_only: usize,
    pub keyword_only: usize,
    pub both: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HybridSearchResult {
    pub results: Vec<HybridHit>,
    pub total: usize,
    pub search_time_ms: u64,
    pub source_breakdown: SourceBreakdown,
    pub weights: HybridWeights,
}

/// Vector counts for one backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VectorStats {
    pub backend: String,
    pub total_vectors: u64,
    pub by_entity_type: HashMap<String, u64>,
    pub by_model: HashMap<String, u64>,
}

/// Outcome of the embedding model consistency check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelMismatchReport {
    pub has_vectors: bool,
    pub mismatch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_model: Option<String>,
    pub existing_models: Vec<String>,
    pub total_vectors: u64,
    pub null_model_count: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of deleting every stored vector.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClearResult {
    pub success: bool,
    pub deleted: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where vectors are stored and searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackend {
    /// Rows in the vectors table, similarity computed in-process. Also
    /// accepted under its legacy name `php`.
    Local,
    /// Rows in the vectors table, similarity computed by SQLite (sqlite-vec).
    Database,
    /// Dense vector field in an external Solr collection.
    Solr,
}

impl VectorBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Database => "database",
            Self::Solr => "solr",
        }
    }
}

impl std::fmt::Display for VectorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "php" => Ok(Self::Local),
            "database" => Ok(Self::Database),
            "solr" => Ok(Self::Solr),
            other => Err(format!("unknown vector backend: {other}")),
        }
    }
}

/// Truncate text to `max_chars` characters, appending "..." if truncated.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((end, _)) => format!("{}...", &content[..end]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(truncate_preview("short", 10), "short");
        assert_eq!(truncate_preview("abcdef", 3), "abc...");
        assert_eq!(truncate_preview("ééééé", 2), "éé...");
    }

    #[test]
    fn backend_parses_known_names() {
        assert_eq!("database".parse::<VectorBackend>().unwrap(), VectorBackend::Database);
        assert_eq!(" SOLR ".parse::<VectorBackend>().unwrap(), VectorBackend::Solr);
        assert_eq!("php".parse::<VectorBackend>().unwrap(), VectorBackend::Local);
        assert!("redis".parse::<VectorBackend>().is_err());
    }

    #[test]
    fn embedding_result_constructors() {
        let ok = EmbeddingResult::success(vec![0.1, 0.2], "m");
        assert_eq!(ok.dimensions, 2);
        assert!(ok.error.is_none());

        let err = EmbeddingResult::failure("m", "boom");
        assert!(err.embedding.is_none());
        assert_eq!(err.error.as_deref(), Some("boom"));
    }
}
