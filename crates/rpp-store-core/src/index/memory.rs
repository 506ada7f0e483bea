//! In-memory [`VectorIndex`] implementation for tests and ephemeral runs.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Queries are a
//! brute-force cosine similarity scan over all stored vectors.

use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{EmbeddingRecord, IndexHit};

use super::{check_dims, top_k, VectorIndex};

/// Non-persistent vector index.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    records: RwLock<Vec<EmbeddingRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored record, by id.
    pub fn get(&self, id: &str) -> Option<EmbeddingRecord> {
        self.read()
            .ok()?
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<EmbeddingRecord>>> {
        self.records
            .read()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<EmbeddingRecord>>> {
        self.records
            .write()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn ids(&self) -> Result<HashSet<String>> {
        Ok(self.read()?.iter().map(|r| r.id.clone()).collect())
    }

    async fn add(&self, records: &[EmbeddingRecord]) -> Result<usize> {
        let mut stored = self.write()?;
        let mut known: HashSet<String> = stored.iter().map(|r| r.id.clone()).collect();
        let mut inserted = 0;
        for record in records {
            if known.insert(record.id.clone()) {
                stored.push(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn dims(&self) -> Result<Option<usize>> {
        Ok(self.read()?.first().map(|r| r.vector.len()))
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        let records = self.read()?;
        check_dims(records.first().map(|r| r.vector.len()), vector.len())?;
        let scored = records
            .iter()
            .map(|r| IndexHit {
                id: r.id.clone(),
                score: cosine_similarity(vector, &r.vector) as f64,
            })
            .collect();
        Ok(top_k(scored, k))
    }

    async fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }
}
