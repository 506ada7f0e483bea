//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the persistent store behind semantic
//! search: one logical collection of [`EmbeddingRecord`]s keyed by service
//! id. Records are created once and never updated in place; adding a
//! record whose id is already present is a no-op.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::models::{EmbeddingRecord, IndexHit};

/// Abstract vector index backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ids`](VectorIndex::ids) | All ids currently indexed |
/// | [`add`](VectorIndex::add) | Insert records, skipping known ids |
/// | [`count`](VectorIndex::count) | Number of stored records |
/// | [`dims`](VectorIndex::dims) | Dimensionality of stored vectors |
/// | [`query`](VectorIndex::query) | Top-k nearest records by cosine similarity |
/// | [`clear`](VectorIndex::clear) | Drop every record (explicit rebuild) |
/// | [`close`](VectorIndex::close) | Release underlying handles |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Ids of all stored records.
    async fn ids(&self) -> Result<HashSet<String>>;

    /// Insert records whose id is not yet present. Returns how many were
    /// actually inserted.
    async fn add(&self, records: &[EmbeddingRecord]) -> Result<usize>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;

    /// Length of the stored vectors, `None` while the index is empty.
    async fn dims(&self) -> Result<Option<usize>>;

    /// Up to `k` records nearest to `vector`, most similar first.
    ///
    /// Fails with [`IndexError::DimensionMismatch`] when `vector` does not
    /// have the stored dimensionality.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>>;

    /// Remove every record.
    async fn clear(&self) -> Result<()>;

    /// Release connections or file handles. Safe to call more than once.
    async fn close(&self) {}
}

/// Errors raised by [`VectorIndex`] implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// The index holds vectors of another model. Querying or extending it
    /// would compare vectors of different spaces.
    #[error(
        "index holds {stored}-dimensional vectors but got a {actual}-dimensional one; \
         run `rpp embed rebuild` after changing the embedding model"
    )]
    DimensionMismatch { stored: usize, actual: usize },
}

/// Ensure a vector of length `actual` fits an index whose vectors have
/// length `stored` (any length fits an empty index).
pub fn check_dims(stored: Option<usize>, actual: usize) -> Result<(), IndexError> {
    match stored {
        Some(stored) if stored != actual => Err(IndexError::DimensionMismatch { stored, actual }),
        _ => Ok(()),
    }
}

/// Rank `(id, similarity)` pairs nearest-first and keep the top `k`.
///
/// The sort is stable, so equal scores keep their input order.
pub fn top_k(mut scored: Vec<IndexHit>, k: usize) -> Vec<IndexHit> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k);
    scored
}
