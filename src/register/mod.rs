//! Register storage: the objects, views and files that get vectorized.
//!
//! [`RegisterStore`] is the SQLite-backed entity source. Strategies only see
//! it through the [`ObjectSource`] and [`FileSource`] traits so tests can
//! substitute in-memory fakes.

pub mod files;
pub mod objects;

use anyhow::Result;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::{self, SharedConnection};
use crate::vectors::types::KeywordHit;

/// A register object as stored in the `objects` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: i64,
    pub uuid: String,
    pub register: Option<String>,
    pub schema: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// The object's own properties.
    pub object: Map<String, Value>,
    pub created: String,
    pub updated: String,
}

/// A file with (possibly) extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub name: String,
    pub mime_type: Option<String>,
    pub size: i64,
    pub extracted_text: Option<String>,
    pub extraction_status: String,
}

/// Query against the object source.
#[derive(Debug, Clone, Default)]
pub struct ObjectQuery {
    pub limit: usize,
    pub offset: usize,
    /// View ids; an object matches when any view selects its register/schema.
    pub views: Vec<String>,
    pub register: Option<String>,
    pub schema: Option<String>,
    /// Ask only for the number of matches.
    pub count_only: bool,
}

/// What the object source returns: the matching objects, or only their count.
#[derive(Debug, Clone)]
pub enum ObjectSearch {
    Objects(Vec<ObjectRecord>),
    Count(u64),
}

/// Query against the file source.
#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    pub limit: usize,
    pub offset: usize,
    /// Empty means any MIME type.
    pub mime_types: Vec<String>,
}

pub trait ObjectSource: Send + Sync {
    fn search_objects(&self, query: &ObjectQuery) -> Result<ObjectSearch>;
}

pub trait FileSource: Send + Sync {
    /// Files whose text extraction completed with non-empty text.
    fn extracted_files(&self, query: &FileQuery) -> Result<Vec<FileRecord>>;
}

/// SQLite-backed register store.
#[derive(Clone)]
pub struct RegisterStore {
    db: SharedConnection,
}

impl RegisterStore {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }

    /// BM25 keyword search over object text. Scores are positive, higher is better.
    pub fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<KeywordHit>> {
        let escaped = escape_fts_query(query);
        if escaped.is_empty() {
            return Ok(Vec::new());
        }

        let conn = db::lock(&self.db)?;
        let mut stmt = conn.prepare(
            "SELECT object_id, rank FROM objects_fts \
             WHERE objects_fts MATCH ?1 ORDER BY rank LIMIT ?2",
        )?;
        let hits = stmt
            .query_map(params![escaped, limit as i64], |row| {
                Ok(KeywordHit {
                    entity_type: "object".to_string(),
                    entity_id: row.get::<_, String>(0)?,
                    score: -row.get::<_, f64>(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }
}

/// Escape a user query for FTS5 MATCH syntax.
///
/// Wraps each whitespace-delimited word in double quotes so FTS5 treats them
/// as individual terms (implicit AND). Strips empty tokens.
fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| format!("\"{}\"", word.replace('"', "")))
        .filter(|w| w != "\"\"")
        .collect::<Vec<_>>()
        .join(" ")
}
