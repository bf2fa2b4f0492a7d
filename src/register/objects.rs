//! Object persistence and the [`ObjectSource`] implementation.

use anyhow::{bail, Result};
use rusqlite::{params, params_from_iter, Row};
use serde_json::{Map, Value};

use super::{ObjectQuery, ObjectRecord, ObjectSearch, ObjectSource, RegisterStore};
use crate::db;

/// An object about to be written. Built from either import shape.
#[derive(Debug, Clone, Default)]
pub struct NewObject {
    pub uuid: Option<String>,
    pub register: Option<String>,
    pub schema: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub object: Map<String, Value>,
}

impl NewObject {
    /// Accept either a structured record (`{"uuid", "register", ..., "object": {...}}`)
    /// or a raw property map whose bookkeeping lives under `@self`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(map) = value.as_object() else {
            bail!("object must be a JSON map");
        };

        if let Some(Value::Object(data)) = map.get("object") {
            return Ok(Self {
                uuid: scalar_string(map.get("uuid")),
                register: scalar_string(map.get("register")),
                schema: scalar_string(map.get("schema")),
                name: scalar_string(map.get("name")),
                description: scalar_string(map.get("description")),
                object: data.clone(),
            });
        }

        let self_meta = map.get("@self").and_then(Value::as_object);
        let meta = |key: &str| self_meta.and_then(|m| scalar_string(m.get(key)));

        let uuid = meta("id")
            .or_else(|| scalar_string(map.get("uuid")))
            .or_else(|| map.get("id").and_then(Value::as_str).map(str::to_string));

        let object = map
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "@self" | "id" | "uuid"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            uuid,
            register: meta("register"),
            schema: meta("schema"),
            name: meta("name"),
            description: meta("description"),
            object,
        })
    }
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

const OBJECT_COLUMNS: &str =
    "id, uuid, register, schema, name, description, object, created, updated";

fn object_from_row(row: &Row<'_>) -> rusqlite::Result<ObjectRecord> {
    let object_json: String = row.get(6)?;
    Ok(ObjectRecord {
        id: row.get(0)?,
        uuid: row.get(1)?,
        register: row.get(2)?,
        schema: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        object: serde_json::from_str(&object_json).unwrap_or_default(),
        created: row.get(7)?,
        updated: row.get(8)?,
    })
}

impl RegisterStore {
    /// Insert an object and index its text for keyword search.
    ///
    /// Returns `None` when an object with the same UUID already exists.
    pub fn insert_object(&self, new: &NewObject) -> Result<Option<ObjectRecord>> {
        let uuid = new
            .uuid
            .clone()
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        let now = chrono::Utc::now().to_rfc3339();

        let mut conn = db::lock(&self.db)?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM objects WHERE uuid = ?1",
            params![uuid],
            |row| row.get(0),
        )?;
        if exists {
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO objects (uuid, register, schema, name, description, object, created, updated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                uuid,
                new.register,
                new.schema,
                new.name,
                new.description,
                serde_json::to_string(&new.object)?,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO objects_fts (content, object_id) VALUES (?1, ?2)",
            params![searchable_text(new), id.to_string()],
        )?;

        let record = tx.query_row(
            &format!("SELECT {OBJECT_COLUMNS} FROM objects WHERE id = ?1"),
            params![id],
            object_from_row,
        )?;
        tx.commit()?;

        tracing::debug!(object_id = id, uuid = %record.uuid, "object stored");
        Ok(Some(record))
    }

    /// Create or replace a saved view.
    pub fn upsert_view(
        &self,
        id: &str,
        name: &str,
        register: Option<&str>,
        schema: Option<&str>,
    ) -> Result<()> {
        let conn = db::lock(&self.db)?;
        conn.execute(
            "INSERT OR REPLACE INTO views (id, name, register, schema) VALUES (?1, ?2, ?3, ?4)",
            params![id, name, register, schema],
        )?;
        Ok(())
    }
}

impl ObjectSource for RegisterStore {
    fn search_objects(&self, query: &ObjectQuery) -> Result<ObjectSearch> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<rusqlite::types::Value> = Vec::new();

        if !query.views.is_empty() {
            let start = values.len() + 1;
            let placeholders: Vec<String> = (start..start + query.views.len())
                .map(|i| format!("?{i}"))
                .collect();
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM views v WHERE v.id IN ({}) \
                 AND (v.register IS NULL OR v.register = objects.register) \
                 AND (v.schema IS NULL OR v.schema = objects.schema))",
                placeholders.join(", ")
            ));
            values.extend(query.views.iter().cloned().map(Into::into));
        }
        if let Some(register) = &query.register {
            values.push(register.clone().into());
            clauses.push(format!("register = ?{}", values.len()));
        }
        if let Some(schema) = &query.schema {
            values.push(schema.clone().into());
            clauses.push(format!("schema = ?{}", values.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let conn = db::lock(&self.db)?;

        if query.count_only {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM objects {where_clause}"),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )?;
            return Ok(ObjectSearch::Count(count as u64));
        }

        values.push((query.limit as i64).into());
        let limit_idx = values.len();
        values.push((query.offset as i64).into());
        let offset_idx = values.len();

        let sql = format!(
            "SELECT {OBJECT_COLUMNS} FROM objects {where_clause} \
             ORDER BY id LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let objects = stmt
            .query_map(params_from_iter(values.iter()), object_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ObjectSearch::Objects(objects))
    }
}

/// Text fed to the keyword index: name, description and every scalar value.
fn searchable_text(new: &NewObject) -> String {
    let mut parts: Vec<String> = Vec::new();
    parts.extend(new.name.clone());
    parts.extend(new.description.clone());
    collect_scalars(&Value::Object(new.object.clone()), &mut parts);
    parts.join(" ")
}

fn collect_scalars(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|v| collect_scalars(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_scalars(v, out)),
        Value::Null => {}
    }
}
