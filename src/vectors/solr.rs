//! Solr dense-vector backend.
//!
//! Vectors are indexed as documents in one collection, with the embedding in a
//! `DenseVectorField` (`vector_field`). Search uses the `{!knn}` query parser
//! through the JSON request API; stats use JSON facets.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::storage::VectorStore;
use super::types::{NewVector, SearchFilters, VectorHit, VectorStats};
use crate::config::SolrSettings;

pub struct SolrVectorStore {
    client: reqwest::Client,
    collection_url: String,
    vector_field: String,
}

impl SolrVectorStore {
    pub fn new(settings: &SolrSettings) -> Result<Self> {
        let base = settings.url.trim().trim_end_matches('/');
        if base.is_empty() {
            bail!("solr url is not configured");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            collection_url: format!("{base}/{}", settings.collection),
            vector_field: settings.vector_field.clone(),
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{path}", self.collection_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("solr request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %url, "solr error");
            bail!("solr error {status}: {body}");
        }

        response
            .json()
            .await
            .map_err(|e| anyhow!("failed to parse solr response: {e}"))
    }
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    adds: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: SelectDocs,
    #[serde(default)]
    facets: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct SelectDocs {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<Map<String, Value>>,
}

#[async_trait]
impl VectorStore for SolrVectorStore {
    fn name(&self) -> &str {
        "solr"
    }

    async fn store(&self, vector: &NewVector) -> Result<i64> {
        let meta = &vector.metadata;
        let doc_id = format!("{}_{}_{}", meta.entity_type, meta.entity_id, meta.chunk_index);

        let mut doc = json!({
            "id": doc_id,
            "entity_type": meta.entity_type,
            "entity_id": meta.entity_id,
            "chunk_index": meta.chunk_index,
            "total_chunks": meta.total_chunks,
            "chunk_text": meta.chunk_text,
            "embedding_model": vector.model,
            "embedding_dimensions": vector.dimensions,
            "metadata_json": serde_json::to_string(&meta.additional_metadata)?,
        });
        doc[self.vector_field.as_str()] = json!(vector.embedding);

        let body = self
            .post("update?commit=true&versions=true", &Value::Array(vec![doc]))
            .await?;
        let parsed: UpdateResponse = serde_json::from_value(body)?;

        // `adds` alternates document id and assigned version.
        let version = parsed
            .adds
            .get(1)
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("solr did not report a version for {doc_id}"))?;

        debug!(doc_id = %doc_id, version, "vector indexed in solr");
        Ok(version)
    }

    async fn search(
        &self,
        query: &[f32],
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<VectorHit>> {
        let vector = serde_json::to_string(query)?;
        let body = json!({
            "query": format!("{{!knn f={} topK={limit}}}{vector}", self.vector_field),
            "limit": limit,
            "fields": "*,score",
            "filter": filter_queries(filters, query.len()),
        });

        let parsed: SelectResponse = serde_json::from_value(self.post("select", &body).await?)?;
        let hits = parsed.response.docs.iter().filter_map(hit_from_doc).collect();
        Ok(hits)
    }

    async fn stats(&self) -> Result<VectorStats> {
        let body = json!({
            "query": "*:*",
            "limit": 0,
            "facet": {
                "entity_types": {"type": "terms", "field": "entity_type", "limit": -1},
                "models": {"type": "terms", "field": "embedding_model", "limit": -1},
            },
        });

        let parsed: SelectResponse = serde_json::from_value(self.post("select", &body).await?)?;
        let facets = parsed.facets.unwrap_or_default();

        Ok(VectorStats {
            backend: "solr".to_string(),
            total_vectors: parsed.response.num_found,
            by_entity_type: facet_buckets(&facets, "entity_types"),
            by_model: facet_buckets(&facets, "models"),
        })
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn filter_queries(filters: &SearchFilters, dimensions: usize) -> Vec<String> {
    let mut fq = vec![format!("embedding_dimensions:{dimensions}")];
    if let Some(entity_type) = &filters.entity_type {
        fq.push(format!("entity_type:{}", quote(entity_type)));
    }
    if !filters.entity_ids.is_empty() {
        let ids: Vec<String> = filters.entity_ids.iter().map(|id| quote(id)).collect();
        fq.push(format!("entity_id:({})", ids.join(" OR ")));
    }
    fq
}

fn hit_from_doc(doc: &Map<String, Value>) -> Option<VectorHit> {
    let text = |key: &str| doc.get(key).and_then(Value::as_str).map(str::to_string);
    let number = |key: &str| doc.get(key).and_then(Value::as_u64).unwrap_or(0) as usize;

    // knn scores cosine as (1 + cos) / 2.
    let score = doc.get("score").and_then(Value::as_f64)?;

    Some(VectorHit {
        vector_id: doc.get("_version_").and_then(Value::as_i64).unwrap_or(0),
        entity_type: text("entity_type")?,
        entity_id: text("entity_id")?,
        chunk_index: number("chunk_index"),
        total_chunks: number("total_chunks").max(1),
        chunk_text: text("chunk_text"),
        similarity: score * 2.0 - 1.0,
        model: text("embedding_model"),
        metadata: text("metadata_json")
            .and_then(|m| serde_json::from_str(&m).ok())
            .unwrap_or_default(),
    })
}

fn facet_buckets(facets: &Map<String, Value>, name: &str) -> HashMap<String, u64> {
    facets
        .get(name)
        .and_then(|f| f.get("buckets"))
        .and_then(Value::as_array)
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|b| {
                    let key = match b.get("val")? {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    Some((key, b.get("count")?.as_u64()?))
                })
                .collect()
        })
        .unwrap_or_default()
}
