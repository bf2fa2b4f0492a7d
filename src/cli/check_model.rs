//! CLI `check-model` command: compare stored vectors with the configured model.

use anyhow::Result;

use openregister::vectors::types::VectorBackend;

use super::App;

pub fn check_model(app: &App, json: bool) -> Result<()> {
    let backend = app.embeddings.backend_kind()?;
    let report = app.embeddings.check_embedding_model_mismatch();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(error) = &report.error {
        println!("Model check failed: {error}");
        return Ok(());
    }

    println!("Vector backend:    {backend}");
    if backend == VectorBackend::Solr {
        println!("NOTE: only the local vectors table is checked, not the Solr collection.");
    }
    println!(
        "Configured model:  {}",
        report.current_model.as_deref().unwrap_or("(unknown)")
    );
    if !report.has_vectors {
        println!("{}", report.message);
        return Ok(());
    }

    println!("Stored vectors:    {}", report.total_vectors);
    println!("Stored models:     {}", report.existing_models.join(", "));
    if report.null_model_count > 0 {
        println!("Without a model:   {}", report.null_model_count);
    }
    println!();
    if report.mismatch {
        println!("WARNING: {}", report.message);
        println!("Run `openregister clear` and `openregister vectorize` to rebuild the vectors.");
    } else {
        println!("Status:            OK ({})", report.message);
    }

    Ok(())
}
