mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use openregister::config::OpenRegisterConfig;
use openregister::vectorization::strategy::{
    ProcessingMode, VectorizeOptions, DEFAULT_BATCH_SIZE, DEFAULT_LIMIT,
};
use openregister::vectors::types::{CustomEmbeddingConfig, HybridWeights};
use openregister::vectors::{DEFAULT_HYBRID_LIMIT, DEFAULT_SEMANTIC_LIMIT};

#[derive(Parser)]
#[command(name = "openregister", version, about = "Vector search for OpenRegister objects and files")]
struct Cli {
    /// Config file (defaults to ~/.openregister/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import objects, views and files from a JSON document
    Import {
        file: PathBuf,
    },
    /// Embed and store one batch of entities
    Vectorize {
        /// Entity type: object or file
        #[arg(default_value = "object")]
        entity_type: String,
        /// serial or parallel
        #[arg(long, default_value = "serial")]
        mode: ProcessingMode,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        /// Skip this many entities before the batch starts
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Restrict objects to these view ids
        #[arg(long = "view")]
        views: Vec<String>,
        #[arg(long)]
        register: Option<String>,
        #[arg(long)]
        schema: Option<String>,
        /// Embedding provider override
        #[arg(long)]
        provider: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Semantic (or hybrid) search over stored vectors
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        /// Only return vectors of this entity type
        #[arg(long)]
        entity_type: Option<String>,
        /// Blend vector similarity with keyword matches
        #[arg(long)]
        hybrid: bool,
        #[arg(long, default_value_t = 0.5)]
        keyword_weight: f64,
        #[arg(long, default_value_t = 0.5)]
        vector_weight: f64,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show vector counts for the active backend
    Stats,
    /// Check stored vectors against the configured embedding model
    CheckModel {
        #[arg(long)]
        json: bool,
    },
    /// Delete all stored vectors
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Embed a sample text to check provider connectivity
    TestEmbedding {
        #[arg(default_value = "OpenRegister embedding connectivity test")]
        text: String,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Run database diagnostics
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => OpenRegisterConfig::load_from(path)?,
        None => OpenRegisterConfig::load()?,
    };

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Command::Doctor = cli.command {
        return cli::doctor::doctor(&config);
    }

    let app = cli::App::open(&config)?;

    match cli.command {
        Command::Import { file } => cli::import::import(&app, &file)?,
        Command::Vectorize {
            entity_type,
            mode,
            batch_size,
            limit,
            offset,
            views,
            register,
            schema,
            provider,
            json,
        } => {
            let options = VectorizeOptions {
                mode,
                batch_size,
                limit,
                offset,
                views,
                register,
                schema,
                provider,
            };
            cli::vectorize::vectorize(&app, &entity_type, &options, json).await?;
        }
        Command::Search {
            query,
            limit,
            entity_type,
            hybrid,
            keyword_weight,
            vector_weight,
            provider,
            json,
        } => {
            let default_limit = if hybrid { DEFAULT_HYBRID_LIMIT } else { DEFAULT_SEMANTIC_LIMIT };
            let args = cli::search::SearchArgs {
                query: &query,
                limit: limit.unwrap_or(default_limit),
                entity_type,
                provider: provider.as_deref(),
                hybrid,
                weights: HybridWeights {
                    solr: keyword_weight,
                    vector: vector_weight,
                },
                json,
            };
            cli::search::search(&app, &args).await?;
        }
        Command::Stats => cli::stats::stats(&app).await?,
        Command::CheckModel { json } => cli::check_model::check_model(&app, json)?,
        Command::Clear { yes } => {
            let db_path = config.resolved_db_path();
            cli::clear::clear(&app, &db_path.display().to_string(), yes)?;
        }
        Command::TestEmbedding {
            text,
            provider,
            model,
            api_key,
            base_url,
        } => {
            let custom = CustomEmbeddingConfig {
                provider,
                model,
                api_key,
                base_url,
            };
            cli::test_embedding::test_embedding(&app, &text, &custom).await?;
        }
        Command::Doctor => {}
    }

    Ok(())
}
