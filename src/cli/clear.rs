//! CLI `clear` command: delete all stored vectors after user confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use openregister::vectors::types::VectorBackend;

use super::App;

/// Only the SQLite backends keep their vectors in the local database.
fn ensure_clearable(backend: VectorBackend) -> Result<()> {
    if backend == VectorBackend::Solr {
        bail!(
            "the active vector backend is solr; clear only deletes the local vectors table. \
             Delete the documents in the Solr collection instead"
        );
    }
    Ok(())
}

pub fn clear(app: &App, db_display: &str, assume_yes: bool) -> Result<()> {
    let backend = app.embeddings.backend_kind()?;
    ensure_clearable(backend)?;

    if !assume_yes {
        println!("WARNING: This will permanently delete ALL stored vectors.");
        println!("Backend:  {backend}");
        println!("Database: {db_display}");
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("clear cancelled");
        }
    }

    let result = app.embeddings.clear_all_embeddings();
    if !result.success {
        bail!(
            "failed to clear vectors: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    println!("Deleted {} vectors from the {backend} backend.", result.deleted);
    Ok(())
}
