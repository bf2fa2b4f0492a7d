//! CLI `test-embedding` command: embed a sample text to check provider
//! connectivity.

use anyhow::Result;

use openregister::vectors::types::{CustomEmbeddingConfig, GeneratedEmbedding};

use super::App;

/// Embed `text` with the configured provider, or with `custom` when a
/// provider is given there.
pub async fn test_embedding(app: &App, text: &str, custom: &CustomEmbeddingConfig) -> Result<()> {
    let started = std::time::Instant::now();

    let generated: GeneratedEmbedding = if custom.provider.is_some() {
        app.embeddings
            .generate_embedding_with_custom_config(text, custom)
            .await?
    } else {
        app.embeddings.generate_embedding(text, None).await?
    };

    let preview: Vec<String> = generated
        .embedding
        .iter()
        .take(5)
        .map(|v| format!("{v:.4}"))
        .collect();

    println!("Embedding OK");
    println!("  Model:       {}", generated.model);
    println!("  Dimensions:  {}", generated.dimensions);
    println!("  Took:        {} ms", started.elapsed().as_millis());
    println!("  First values: [{}, ...]", preview.join(", "));
    Ok(())
}
