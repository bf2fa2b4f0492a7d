use anyhow::Result;

use openregister::vectors::types::{HybridWeights, SearchFilters};

use super::{one_line, App};

/// Options for the `search` command.
pub struct SearchArgs<'a> {
    pub query: &'a str,
    pub limit: usize,
    pub entity_type: Option<String>,
    pub provider: Option<&'a str>,
    /// Blend with FTS5 keyword hits instead of pure vector search.
    pub hybrid: bool,
    pub weights: HybridWeights,
    pub json: bool,
}

/// Run a semantic or hybrid search from the terminal.
pub async fn search(app: &App, args: &SearchArgs<'_>) -> Result<()> {
    if args.hybrid {
        let keyword_hits = app.store.keyword_search(args.query, args.limit * 2)?;
        let response = app
            .embeddings
            .hybrid_search(args.query, &keyword_hits, args.limit, args.weights, args.provider)
            .await?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(());
        }
        if response.results.is_empty() {
            println!("No results found.");
            return Ok(());
        }

        let b = &response.source_breakdown;
        println!(
            "Found {} result(s) in {} ms (vector only: {}, keyword only: {}, both: {})\n",
            response.total, response.search_time_ms, b.vector_only, b.keyword_only, b.both
        );
        for (i, hit) in response.results.iter().enumerate() {
            println!(
                "  {}. [{} {}] combined {:.4} (vector {}, keyword {})",
                i + 1,
                hit.entity_type,
                hit.entity_id,
                hit.combined_score,
                hit.vector_score.map_or("-".to_string(), |s| format!("{s:.4}")),
                hit.keyword_score.map_or("-".to_string(), |s| format!("{s:.4}")),
            );
            if let Some(text) = &hit.chunk_text {
                println!("     {}", one_line(text, 120));
            }
        }
        return Ok(());
    }

    let filters = SearchFilters {
        entity_type: args.entity_type.clone(),
        entity_ids: Vec::new(),
    };
    let hits = app
        .embeddings
        .semantic_search(args.query, args.limit, &filters, args.provider)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "  {}. [{} {} chunk {}/{}] similarity {:.4}",
            i + 1,
            hit.entity_type,
            hit.entity_id,
            hit.chunk_index + 1,
            hit.total_chunks,
            hit.similarity
        );
        if let Some(text) = &hit.chunk_text {
            println!("     {}", one_line(text, 120));
        }
    }

    Ok(())
}
