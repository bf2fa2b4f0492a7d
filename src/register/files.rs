use anyhow::Result;
use rusqlite::{params, params_from_iter, Row};
use serde::Deserialize;

use super::{FileQuery, FileRecord, FileSource, RegisterStore};
use crate::db;

/// A file to register, typically read from an import document.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFile {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: i64,
    /// Extracted plain text; its presence marks extraction as completed.
    #[serde(default)]
    pub text: Option<String>,
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        name: row.get(2)?,
        mime_type: row.get(3)?,
        size: row.get(4)?,
        extracted_text: row.get(5)?,
        extraction_status: row.get(6)?,
    })
}

impl RegisterStore {
    /// Insert or update a file by path. Returns the file id.
    pub fn upsert_file(&self, file: &NewFile) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        let status = match file.text.as_deref() {
            Some(text) if !text.trim().is_empty() => "completed",
            _ => "pending",
        };

        let conn = db::lock(&self.db)?;
        conn.execute(
            "INSERT INTO files (path, name, mime_type, size, extracted_text, extraction_status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
             ON CONFLICT(path) DO UPDATE SET name = excluded.name, mime_type = excluded.mime_type, \
             size = excluded.size, extracted_text = excluded.extracted_text, \
             extraction_status = excluded.extraction_status, updated_at = excluded.updated_at",
            params![file.path, file.name, file.mime_type, file.size, file.text, status, now],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM files WHERE path = ?1",
            params![file.path],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}

impl FileSource for RegisterStore {
    fn extracted_files(&self, query: &FileQuery) -> Result<Vec<FileRecord>> {
        let mut sql = String::from(
            "SELECT id, path, name, mime_type, size, extracted_text, extraction_status FROM files \
             WHERE extraction_status = 'completed' AND length(trim(COALESCE(extracted_text, ''))) > 0",
        );
        let mut values: Vec<rusqlite::types::Value> = Vec::new();

        if !query.mime_types.is_empty() {
            let placeholders: Vec<String> =
                (1..=query.mime_types.len()).map(|i| format!("?{i}")).collect();
            sql.push_str(&format!(" AND mime_type IN ({})", placeholders.join(", ")));
            values.extend(query.mime_types.iter().cloned().map(Into::into));
        }

        values.push((query.limit as i64).into());
        let limit_idx = values.len();
        values.push((query.offset as i64).into());
        sql.push_str(&format!(" ORDER BY id LIMIT ?{limit_idx} OFFSET ?{}", values.len()));

        let conn = db::lock(&self.db)?;
        let mut stmt = conn.prepare(&sql)?;
        let files = stmt
            .query_map(params_from_iter(values.iter()), file_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(files)
    }
}
