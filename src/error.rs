//! Error taxonomy for the vectorization pipeline.
//!
//! Configuration problems and a missing strategy surface to the caller as
//! typed errors. Per-item and per-entity failures never reach this type; the
//! orchestrator folds them into [`crate::vectorization::BatchVectorizationResult`].

use thiserror::Error;

/// Errors surfaced by the vectorization service and the embedding facade.
#[derive(Debug, Error)]
pub enum VectorError {
    /// No strategy is registered for the requested entity type.
    #[error("No vectorization strategy registered for entity type: {0}")]
    StrategyNotFound(String),

    /// Missing or invalid provider, model, API key, or backend configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Any failure while producing an embedding. Only the cause's message survives.
    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    /// The vector backend rejected a store or search request.
    #[error("vector storage failed: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VectorError {
    /// Wrap an arbitrary failure into the single embedding-failure bucket.
    pub fn embedding(cause: impl std::fmt::Display) -> Self {
        Self::EmbeddingFailed(cause.to_string())
    }

    /// `true` for errors a caller should treat as a configuration problem.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::StrategyNotFound(_))
    }
}

pub type Result<T, E = VectorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_not_found_message_names_entity_type() {
        let err = VectorError::StrategyNotFound("invoice".into());
        assert_eq!(
            err.to_string(),
            "No vectorization strategy registered for entity type: invoice"
        );
        assert!(err.is_config());
    }

    #[test]
    fn embedding_failure_keeps_cause_text() {
        let err = VectorError::embedding("connection refused");
        assert_eq!(err.to_string(), "Embedding generation failed: connection refused");
        assert!(!err.is_config());
    }
}
