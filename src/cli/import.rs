//! CLI `import` command: load objects, views and files from a JSON document.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use openregister::register::files::NewFile;
use openregister::register::objects::NewObject;

use super::App;

/// Import format. Objects may be structured records or raw property maps.
#[derive(Debug, Deserialize)]
struct ImportData {
    #[serde(default)]
    views: Vec<ImportView>,
    #[serde(default)]
    objects: Vec<Value>,
    #[serde(default)]
    files: Vec<NewFile>,
}

#[derive(Debug, Deserialize)]
struct ImportView {
    id: String,
    name: String,
    #[serde(default)]
    register: Option<String>,
    #[serde(default)]
    schema: Option<String>,
}

/// Import register data from a JSON file. Objects whose UUID already exists
/// are skipped; files are upserted by path.
pub fn import(app: &App, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
    let data: ImportData = serde_json::from_str(&json).context("failed to parse import JSON")?;

    println!(
        "Importing {} views, {} objects and {} files...",
        data.views.len(),
        data.objects.len(),
        data.files.len()
    );

    for view in &data.views {
        app.store.upsert_view(
            &view.id,
            &view.name,
            view.register.as_deref(),
            view.schema.as_deref(),
        )?;
    }

    let mut imported = 0u64;
    let mut skipped = 0u64;
    let mut invalid = 0u64;

    for (position, value) in data.objects.iter().enumerate() {
        let object = match NewObject::from_value(value) {
            Ok(object) => object,
            Err(e) => {
                eprintln!("Warning: object #{position} skipped: {e}");
                invalid += 1;
                continue;
            }
        };

        match app.store.insert_object(&object)? {
            Some(_) => imported += 1,
            None => skipped += 1,
        }
    }

    for new_file in &data.files {
        app.store.upsert_file(new_file)?;
    }

    println!("Import complete:");
    println!("  Views:            {}", data.views.len());
    println!("  Objects imported: {imported}");
    println!("  Objects skipped:  {skipped} (already exist)");
    if invalid > 0 {
        println!("  Objects invalid:  {invalid}");
    }
    println!("  Files:            {}", data.files.len());
    Ok(())
}
