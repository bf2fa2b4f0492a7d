use anyhow::Result;

use super::App;

/// Display vector statistics for the active backend.
pub async fn stats(app: &App) -> Result<()> {
    let stats = app.embeddings.get_stats().await?;

    println!("Vector Statistics");
    println!("{}", "=".repeat(40));
    println!("  Backend:             {}", stats.backend);
    println!("  Total vectors:       {}", stats.total_vectors);
    println!();

    println!("By Entity Type:");
    let mut types: Vec<_> = stats.by_entity_type.iter().collect();
    types.sort();
    for (entity_type, count) in types {
        println!("  {:<24} {}", entity_type, count);
    }
    println!();

    println!("By Model:");
    let mut models: Vec<_> = stats.by_model.iter().collect();
    models.sort();
    for (model, count) in models {
        println!("  {:<24} {}", model, count);
    }

    Ok(())
}
