//! SQL DDL for all OpenRegister tables.
//!
//! Defines `objects`, `objects_fts` (FTS5), `views`, `files`, `vectors`, and
//! `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent initialization.
//! Vectors live in a plain table with an `f32` blob column because their
//! dimensionality depends on the embedding model; similarity in the database
//! backend goes through sqlite-vec's scalar distance functions.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Register objects
CREATE TABLE IF NOT EXISTS objects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    register TEXT,
    schema TEXT,
    name TEXT,
    description TEXT,
    object TEXT NOT NULL,
    created TEXT NOT NULL,
    updated TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_objects_register ON objects(register);
CREATE INDEX IF NOT EXISTS idx_objects_schema ON objects(schema);

-- Keyword index over serialized object text (BM25)
CREATE VIRTUAL TABLE IF NOT EXISTS objects_fts USING fts5(
    content,
    object_id UNINDEXED
);

-- Saved views: a register/schema selection. NULL matches anything.
CREATE TABLE IF NOT EXISTS views (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    register TEXT,
    schema TEXT
);

-- Files with extracted text
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    mime_type TEXT,
    size INTEGER NOT NULL DEFAULT 0,
    extracted_text TEXT,
    extraction_status TEXT NOT NULL DEFAULT 'pending'
        CHECK(extraction_status IN ('pending','processing','completed','failed')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_files_status ON files(extraction_status);

-- Stored embeddings
CREATE TABLE IF NOT EXISTS vectors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL DEFAULT 0,
    total_chunks INTEGER NOT NULL DEFAULT 1,
    chunk_text TEXT,
    embedding BLOB NOT NULL,
    embedding_model TEXT,
    embedding_dimensions INTEGER NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL,
    CHECK(chunk_index >= 0 AND chunk_index < total_chunks)
);

CREATE INDEX IF NOT EXISTS idx_vectors_entity ON vectors(entity_type, entity_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
