//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use openregister::config::OpenRegisterConfig;
use openregister::db;
use openregister::embedding::resolve_embedding_config;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &OpenRegisterConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `openregister import <file>` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("OpenRegister Health Report");
    println!("==========================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("sqlite-vec:        {}", report.sqlite_vec_version);
    println!();
    println!("Embeddings:");
    match resolve_embedding_config(&config.llm, None) {
        Ok(embedding) => {
            println!("  Provider:        {}", embedding.provider);
            println!("  Model:           {}", embedding.model);
            if embedding.provider.requires_api_key() && embedding.api_key.is_none() {
                println!("  WARNING: no API key configured for {}", embedding.provider);
            }
        }
        Err(e) => println!("  ERROR: {e}"),
    }
    println!("  Vector backend:  {}", config.llm.vector_backend);
    println!();
    println!("Row counts:");
    println!("  Objects:         {}", report.object_count);
    println!("  Files:           {}", report.file_count);
    println!("  Vectors:         {}", report.vector_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db {}", db_path.display());
        println!("  2. Or delete the database and re-import the register data.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
