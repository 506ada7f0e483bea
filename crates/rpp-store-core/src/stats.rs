//! Embedding coverage statistics.

use serde::Serialize;

/// Snapshot of how much of the catalog is embedded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingStatistics {
    /// Whether the last indexer run in this process finished every batch.
    pub embeddings_computed: bool,
    pub total_embeddings: usize,
    pub total_services: usize,
    /// `100 × embeddings / services`, rounded to two decimals.
    pub coverage_percentage: f64,
}

impl EmbeddingStatistics {
    pub fn new(embeddings_computed: bool, total_embeddings: usize, total_services: usize) -> Self {
        Self {
            embeddings_computed,
            total_embeddings,
            total_services,
            coverage_percentage: coverage_percentage(total_embeddings, total_services),
        }
    }

    /// Statistics reported when the index cannot be reached.
    pub fn unavailable(total_services: usize) -> Self {
        Self::new(false, 0, total_services)
    }
}

/// Percentage of services with an embedding, rounded to two decimals.
/// Zero services yields `0.0`.
pub fn coverage_percentage(embeddings: usize, services: usize) -> f64 {
    if services == 0 {
        return 0.0;
    }
    let raw = embeddings as f64 / services as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}
