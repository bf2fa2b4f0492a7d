pub mod check_model;
pub mod clear;
pub mod doctor;
pub mod import;
pub mod search;
pub mod stats;
pub mod test_embedding;
pub mod vectorize;

use anyhow::{Context, Result};
use std::sync::Arc;

use openregister::config::{OpenRegisterConfig, SettingsProvider};
use openregister::db;
use openregister::embedding::HttpGeneratorFactory;
use openregister::register::RegisterStore;
use openregister::vectorization::{StrategyRegistry, VectorizationService};
use openregister::vectors::VectorEmbeddings;

/// Services wired against the configured database.
pub struct App {
    pub store: Arc<RegisterStore>,
    pub embeddings: Arc<VectorEmbeddings>,
    pub settings: Arc<dyn SettingsProvider>,
}

impl App {
    pub fn open(config: &OpenRegisterConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        let db = db::shared(conn);

        let settings: Arc<dyn SettingsProvider> = Arc::new(config.clone());
        let embeddings = Arc::new(VectorEmbeddings::new(
            db.clone(),
            settings.clone(),
            Arc::new(HttpGeneratorFactory),
        ));
        Ok(Self {
            store: Arc::new(RegisterStore::new(db)),
            embeddings,
            settings,
        })
    }

    pub fn vectorization_service(&self) -> VectorizationService {
        let registry = StrategyRegistry::with_register(self.store.clone(), self.settings.clone());
        VectorizationService::new(registry, self.embeddings.clone())
    }
}

/// Truncate to `max` characters for one-line terminal output.
pub(crate) fn one_line(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    openregister::vectors::types::truncate_preview(&flat, max)
}
