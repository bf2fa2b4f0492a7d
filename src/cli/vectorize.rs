//! CLI `vectorize` command: run one batch for an entity type.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use openregister::vectorization::strategy::VectorizeOptions;

use super::App;

/// Run a vectorization batch and print its summary.
pub async fn vectorize(
    app: &App,
    entity_type: &str,
    options: &VectorizeOptions,
    json: bool,
) -> Result<()> {
    let service = app.vectorization_service();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg} ({elapsed})")
            .expect("valid template"),
    );
    spinner.set_message(format!("Vectorizing {entity_type} entities..."));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = service.vectorize_batch(entity_type, options).await;
    spinner.finish_and_clear();
    let result = outcome.with_context(|| format!("vectorization of {entity_type} failed"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Vectorization of '{}' finished", result.entity_type);
    println!("{}", "=".repeat(40));
    println!("  Entities:    {}", result.total_entities);
    println!("  Items:       {}", result.total_items);
    println!("  Vectorized:  {}", result.vectorized);
    println!("  Failed:      {}", result.failed);

    if !result.errors.is_empty() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            match err.item_index {
                Some(index) => println!("  {} #{index}: {}", err.entity_id, err.error),
                None => println!("  {}: {}", err.entity_id, err.error),
            }
        }
    }

    Ok(())
}
