//! Vector backends backed by the `vectors` table.
//!
//! [`SqliteVectorStore`] serves both the `local` backend (similarity computed
//! in-process over decoded rows) and the `database` backend (similarity
//! computed by sqlite-vec's `vec_distance_cosine`). The Solr backend lives in
//! [`super::solr`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::hybrid::cosine_similarity;
use super::types::{NewVector, SearchFilters, VectorHit, VectorStats};
use crate::db::{self, SharedConnection};

/// A place where vectors are stored and searched.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name as it appears in settings.
    fn name(&self) -> &str;

    /// Persist one vector and return its backend id.
    async fn store(&self, vector: &NewVector) -> Result<i64>;

    /// Nearest neighbours of `query`, most similar first.
    async fn search(
        &self,
        query: &[f32],
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<VectorHit>>;

    async fn stats(&self) -> Result<VectorStats>;
}

/// Where similarity is computed for rows of the vectors table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    InProcess,
    Sql,
}

pub struct SqliteVectorStore {
    db: SharedConnection,
    scoring: Scoring,
}

impl SqliteVectorStore {
    pub fn new(db: SharedConnection, scoring: Scoring) -> Self {
        Self { db, scoring }
    }

    pub fn local(db: SharedConnection) -> Self {
        Self::new(db, Scoring::InProcess)
    }

    pub fn database(db: SharedConnection) -> Self {
        Self::new(db, Scoring::Sql)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &str {
        match self.scoring {
            Scoring::InProcess => "local",
            Scoring::Sql => "database",
        }
    }

    async fn store(&self, vector: &NewVector) -> Result<i64> {
        let conn = db::lock(&self.db)?;
        insert_vector(&conn, vector)
    }

    async fn search(
        &self,
        query: &[f32],
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<VectorHit>> {
        let conn = db::lock(&self.db)?;
        match self.scoring {
            Scoring::InProcess => search_in_process(&conn, query, limit, filters),
            Scoring::Sql => search_in_sql(&conn, query, limit, filters),
        }
    }

    async fn stats(&self) -> Result<VectorStats> {
        let conn = db::lock(&self.db)?;
        let mut stats = table_stats(&conn)?;
        stats.backend = self.name().to_string();
        Ok(stats)
    }
}

/// Store a vector row and return its id. A row for the same entity chunk is
/// replaced, and chunks past the entity's new `total_chunks` are dropped.
pub fn insert_vector(conn: &Connection, vector: &NewVector) -> Result<i64> {
    let meta = &vector.metadata;
    let metadata_json = serde_json::to_string(&meta.additional_metadata)?;
    let now = chrono::Utc::now().to_rfc3339();

    let id = conn
        .query_row(
            "INSERT INTO vectors (entity_type, entity_id, chunk_index, total_chunks, chunk_text, \
             embedding, embedding_model, embedding_dimensions, metadata, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT(entity_type, entity_id, chunk_index) DO UPDATE SET \
             total_chunks = excluded.total_chunks, chunk_text = excluded.chunk_text, \
             embedding = excluded.embedding, embedding_model = excluded.embedding_model, \
             embedding_dimensions = excluded.embedding_dimensions, \
             metadata = excluded.metadata, created_at = excluded.created_at \
             RETURNING id",
            params![
                meta.entity_type,
                meta.entity_id,
                meta.chunk_index as i64,
                meta.total_chunks as i64,
                meta.chunk_text,
                db::embedding_to_bytes(&vector.embedding),
                vector.model,
                vector.dimensions as i64,
                metadata_json,
                now,
            ],
            |row| row.get(0),
        )
        .with_context(|| {
            format!(
                "failed to store vector for {} {} chunk {}",
                meta.entity_type, meta.entity_id, meta.chunk_index
            )
        })?;

    conn.execute(
        "DELETE FROM vectors WHERE entity_type = ?1 AND entity_id = ?2 AND chunk_index >= ?3",
        params![meta.entity_type, meta.entity_id, meta.total_chunks as i64],
    )?;

    Ok(id)
}

/// Totals over the vectors table, grouped by entity type and model.
pub fn table_stats(conn: &Connection) -> Result<VectorStats> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get(0))?;

    let group = |column: &str| -> Result<HashMap<String, u64>> {
        let sql = format!(
            "SELECT COALESCE({column}, 'unknown'), COUNT(*) FROM vectors GROUP BY {column}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;
        let mut map = HashMap::new();
        for row in rows {
            let (key, count) = row?;
            *map.entry(key).or_insert(0) += count;
        }
        Ok(map)
    };

    Ok(VectorStats {
        backend: String::new(),
        total_vectors: total as u64,
        by_entity_type: group("entity_type")?,
        by_model: group("embedding_model")?,
    })
}

const HIT_COLUMNS: &str =
    "id, entity_type, entity_id, chunk_index, total_chunks, chunk_text, embedding_model, metadata";

fn hit_from_row(row: &Row<'_>, similarity: f64) -> rusqlite::Result<VectorHit> {
    let metadata: Option<String> = row.get(7)?;
    Ok(VectorHit {
        vector_id: row.get(0)?,
        entity_type: row.get(1)?,
        entity_id: row.get(2)?,
        chunk_index: row.get::<_, i64>(3)? as usize,
        total_chunks: row.get::<_, i64>(4)? as usize,
        chunk_text: row.get(5)?,
        similarity,
        model: row.get(6)?,
        metadata: metadata
            .and_then(|m| serde_json::from_str::<Map<String, Value>>(&m).ok())
            .unwrap_or_default(),
    })
}

/// WHERE clause for the filters plus the dimension check, with its values.
fn filter_clause(
    filters: &SearchFilters,
    dimensions: usize,
) -> (String, Vec<rusqlite::types::Value>) {
    let mut values: Vec<rusqlite::types::Value> = vec![(dimensions as i64).into()];
    let mut clauses = vec!["embedding_dimensions = ?1".to_string()];

    if let Some(entity_type) = &filters.entity_type {
        values.push(entity_type.clone().into());
        clauses.push(format!("entity_type = ?{}", values.len()));
    }
    if !filters.entity_ids.is_empty() {
        let start = values.len() + 1;
        let placeholders: Vec<String> = (start..start + filters.entity_ids.len())
            .map(|i| format!("?{i}"))
            .collect();
        clauses.push(format!("entity_id IN ({})", placeholders.join(", ")));
        values.extend(filters.entity_ids.iter().cloned().map(Into::into));
    }

    (format!("WHERE {}", clauses.join(" AND ")), values)
}

fn search_in_process(
    conn: &Connection,
    query: &[f32],
    limit: usize,
    filters: &SearchFilters,
) -> Result<Vec<VectorHit>> {
    let (where_clause, values) = filter_clause(filters, query.len());
    let sql = format!("SELECT {HIT_COLUMNS}, embedding FROM vectors {where_clause}");

    let mut stmt = conn.prepare(&sql)?;
    let mut hits = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            let blob: Vec<u8> = row.get(8)?;
            let similarity = cosine_similarity(query, &db::bytes_to_embedding(&blob));
            hit_from_row(row, similarity)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
    hits.truncate(limit);
    Ok(hits)
}

fn search_in_sql(
    conn: &Connection,
    query: &[f32],
    limit: usize,
    filters: &SearchFilters,
) -> Result<Vec<VectorHit>> {
    let (where_clause, mut values) = filter_clause(filters, query.len());
    values.push(db::embedding_to_bytes(query).into());
    let query_idx = values.len();
    values.push((limit as i64).into());
    let limit_idx = values.len();

    // vec_distance_cosine returns 1 - cosine similarity.
    let sql = format!(
        "SELECT {HIT_COLUMNS}, vec_distance_cosine(embedding, ?{query_idx}) AS distance \
         FROM vectors {where_clause} ORDER BY distance LIMIT ?{limit_idx}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let hits = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            let distance: f64 = row.get(8)?;
            hit_from_row(row, 1.0 - distance)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectors::types::EntityVectorMetadata;

    fn vector(entity_id: &str, embedding: Vec<f32>, model: &str) -> NewVector {
        let dimensions = embedding.len();
        NewVector {
            metadata: EntityVectorMetadata::new("object", entity_id),
            embedding,
            model: model.into(),
            dimensions,
        }
    }

    fn shared_db() -> SharedConnection {
        db::shared(db::open_memory_database().unwrap())
    }

    #[tokio::test]
    async fn local_search_orders_by_similarity() {
        let store = SqliteVectorStore::local(shared_db());
        store.store(&vector("1", vec![1.0, 0.0, 0.0], "m")).await.unwrap();
        store.store(&vector("2", vec![0.7, 0.7, 0.0], "m")).await.unwrap();
        store.store(&vector("3", vec![0.0, 0.0, 1.0], "m")).await.unwrap();

        let hits = store
            .search(&[1.0, 0.1, 0.0], 2, &SearchFilters::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entity_id, "1");
        assert_eq!(hits[1].entity_id, "2");
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[tokio::test]
    async fn database_search_matches_local_ranking() {
        let db = shared_db();
        let local = SqliteVectorStore::local(db.clone());
        let sql = SqliteVectorStore::database(db);
        local.store(&vector("a", vec![0.0, 1.0], "m")).await.unwrap();
        local.store(&vector("b", vec![1.0, 0.0], "m")).await.unwrap();

        let query = [0.9, 0.1];
        let from_local = local.search(&query, 2, &SearchFilters::default()).await.unwrap();
        let from_sql = sql.search(&query, 2, &SearchFilters::default()).await.unwrap();

        assert_eq!(from_sql[0].entity_id, "b");
        assert_eq!(from_local[0].entity_id, from_sql[0].entity_id);
        assert!((from_local[0].similarity - from_sql[0].similarity).abs() < 1e-4);
    }

    #[tokio::test]
    async fn search_skips_other_dimensions_and_applies_filters() {
        let store = SqliteVectorStore::local(shared_db());
        store.store(&vector("1", vec![1.0, 0.0], "m")).await.unwrap();
        store.store(&vector("2", vec![1.0, 0.0, 0.0], "m")).await.unwrap();
        let mut file = vector("3", vec![1.0, 0.0], "m");
        file.metadata.entity_type = "file".into();
        store.store(&file).await.unwrap();

        let all_2d = store.search(&[1.0, 0.0], 10, &SearchFilters::default()).await.unwrap();
        assert_eq!(all_2d.len(), 2);

        let filters = SearchFilters { entity_type: Some("file".into()), entity_ids: vec![] };
        let files = store.search(&[1.0, 0.0], 10, &filters).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].entity_id, "3");

        let filters = SearchFilters { entity_type: None, entity_ids: vec!["1".into()] };
        let by_id = store.search(&[1.0, 0.0], 10, &filters).await.unwrap();
        assert_eq!(by_id.len(), 1);
    }

    #[tokio::test]
    async fn stats_group_by_type_and_model() {
        let store = SqliteVectorStore::database(shared_db());
        store.store(&vector("1", vec![1.0], "ada")).await.unwrap();
        store.store(&vector("2", vec![1.0], "ada")).await.unwrap();
        store.store(&vector("3", vec![1.0], "nomic")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.backend, "database");
        assert_eq!(stats.total_vectors, 3);
        assert_eq!(stats.by_entity_type.get("object"), Some(&3));
        assert_eq!(stats.by_model.get("ada"), Some(&2));
        assert_eq!(stats.by_model.get("nomic"), Some(&1));
    }

    #[tokio::test]
    async fn restoring_a_chunk_replaces_its_row() {
        let store = SqliteVectorStore::local(shared_db());
        let first = store.store(&vector("1", vec![1.0, 0.0], "ada")).await.unwrap();
        let second = store.store(&vector("1", vec![0.0, 1.0], "nomic")).await.unwrap();
        assert_eq!(first, second);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_vectors, 1);
        assert_eq!(stats.by_model.get("nomic"), Some(&1));

        let hits = store.search(&[0.0, 1.0], 5, &SearchFilters::default()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].similarity - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn fewer_chunks_drop_the_surplus_rows() {
        let store = SqliteVectorStore::database(shared_db());
        for index in 0..3 {
            let mut chunk = vector("doc", vec![1.0], "m");
            chunk.metadata.chunk_index = index;
            chunk.metadata.total_chunks = 3;
            store.store(&chunk).await.unwrap();
        }

        let mut rechunked = vector("doc", vec![1.0], "m");
        rechunked.metadata.total_chunks = 1;
        store.store(&rechunked).await.unwrap();

        assert_eq!(store.stats().await.unwrap().total_vectors, 1);
    }

    #[tokio::test]
    async fn chunk_index_must_be_below_total() {
        let store = SqliteVectorStore::local(shared_db());
        let mut bad = vector("1", vec![1.0], "m");
        bad.metadata.chunk_index = 1;
        bad.metadata.total_chunks = 1;
        assert!(store.store(&bad).await.is_err());
    }
}
