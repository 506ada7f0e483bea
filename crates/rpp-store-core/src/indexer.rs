//! Incremental embedding indexer.
//!
//! Ensures every catalog service has a vector in the index:
//!
//! 1. Fetch ids already indexed (a failed fetch counts as "none indexed").
//! 2. Keep catalog services (catalog order) whose id is missing.
//! 3. Embed them in fixed-size batches, strictly one after another, one
//!    provider call per batch.
//! 4. Insert each batch's records before embedding the next.
//!
//! Every vector must have the provider's declared dimensionality (when it
//! declares one) and the dimensionality already stored in the index.
//!
//! An error aborts the remaining batches. Batches already inserted stay in
//! the index; running the indexer again embeds only what is still missing.
//!
//! Known ids are never re-embedded, even when the service text changed
//! since it was indexed. Refreshing stale records means clearing the index
//! first (see [`rebuild_embeddings`]).

use std::collections::HashSet;

use anyhow::{bail, Result};
use tracing::{debug, warn};

use crate::embedding::EmbeddingProvider;
use crate::index::{check_dims, VectorIndex};
use crate::models::{Catalog, EmbeddingRecord, Service};
use crate::text::embedding_text;

/// Services per embedding request.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Counters from one indexer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Catalog services that already had a record.
    pub already_indexed: usize,
    /// Catalog services that needed an embedding.
    pub pending: usize,
    /// Records inserted by this run.
    pub embedded: usize,
    /// Embedding requests issued.
    pub batches: usize,
}

/// Embed and index every catalog service not yet present in `index`.
pub async fn compute_embeddings(
    index: &dyn VectorIndex,
    provider: &dyn EmbeddingProvider,
    catalog: &Catalog,
    batch_size: usize,
) -> Result<IndexReport> {
    if batch_size == 0 {
        bail!("embedding batch size must be > 0");
    }

    let existing: HashSet<String> = match index.ids().await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "could not list indexed ids; treating index as empty");
            HashSet::new()
        }
    };

    let pending: Vec<&Service> = catalog
        .iter()
        .filter(|s| !existing.contains(s.id()))
        .collect();

    let mut expected_dims = match provider.dims() {
        0 => None,
        dims => Some(dims),
    };
    if !pending.is_empty() {
        let stored = index.dims().await?;
        if let (Some(stored), Some(declared)) = (stored, expected_dims) {
            check_dims(Some(stored), declared)?;
        }
        expected_dims = stored.or(expected_dims);
    }

    let mut report = IndexReport {
        already_indexed: catalog.len() - pending.len(),
        pending: pending.len(),
        ..IndexReport::default()
    };

    for (batch_no, batch) in pending.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|s| embedding_text(s)).collect();
        let vectors = provider.embed(&texts).await?;
        report.batches += 1;

        if vectors.len() != batch.len() {
            bail!(
                "embedding provider returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            );
        }
        for vector in &vectors {
            check_dims(expected_dims, vector.len())?;
            expected_dims = Some(vector.len());
        }

        let records: Vec<EmbeddingRecord> = batch
            .iter()
            .zip(texts)
            .zip(vectors)
            .map(|((service, document), vector)| EmbeddingRecord {
                id: service.id().to_string(),
                vector,
                name: service.name.clone(),
                description: service.description.clone(),
                document,
            })
            .collect();

        report.embedded += index.add(&records).await?;

        let start = batch_no * batch_size;
        debug!(
            from = start,
            to = start + batch.len() - 1,
            "computed embeddings for services"
        );
    }

    Ok(report)
}

/// Drop every record, then index the whole catalog from scratch.
pub async fn rebuild_embeddings(
    index: &dyn VectorIndex,
    provider: &dyn EmbeddingProvider,
    catalog: &Catalog,
    batch_size: usize,
) -> Result<IndexReport> {
    index.clear().await?;
    compute_embeddings(index, provider, catalog, batch_size).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::index::memory::InMemoryIndex;

    /// Deterministic provider that records every batch it receives.
    #[derive(Default)]
    struct RecordingProvider {
        calls: AtomicUsize,
        batches: Mutex<Vec<Vec<String>>>,
        fail_on_call: Option<usize>,
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingProvider {
        fn model_name(&self) -> &str {
            "recording"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_call == Some(call) {
                bail!("provider unavailable");
            }
            self.batches.lock().unwrap().push(texts.to_vec());
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn catalog(ids: &[&str]) -> Catalog {
        ids.iter()
            .map(|id| Service::new(format!("https://example.org/{id}"), "", *id, "", vec![]).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn embeds_only_missing_services() {
        let index = InMemoryIndex::new();
        let provider = RecordingProvider::default();
        compute_embeddings(&index, &provider, &catalog(&["A", "B"]), 500)
            .await
            .unwrap();

        let report = compute_embeddings(&index, &provider, &catalog(&["A", "B", "C"]), 500)
            .await
            .unwrap();

        assert_eq!(
            report,
            IndexReport { already_indexed: 2, pending: 1, embedded: 1, batches: 1 }
        );
        let batches = provider.batches.lock().unwrap();
        assert_eq!(batches.last().unwrap(), &vec!["C. ".to_string()]);
    }

    #[tokio::test]
    async fn rerun_makes_no_embedding_calls() {
        let index = InMemoryIndex::new();
        let provider = RecordingProvider::default();
        let cat = catalog(&["A", "B", "C"]);
        compute_embeddings(&index, &provider, &cat, 500).await.unwrap();
        let calls_before = provider.calls.load(Ordering::SeqCst);

        let report = compute_embeddings(&index, &provider, &cat, 500).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), calls_before);
        assert_eq!(report.pending, 0);
        assert_eq!(report.batches, 0);
    }

    #[tokio::test]
    async fn splits_into_sequential_batches() {
        let index = InMemoryIndex::new();
        let provider = RecordingProvider::default();
        let report = compute_embeddings(&index, &provider, &catalog(&["A", "B", "C", "D", "E"]), 2)
            .await
            .unwrap();

        assert_eq!(report.batches, 3);
        let sizes: Vec<usize> = provider.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(index.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn failure_keeps_earlier_batches_and_recovers() {
        let index = InMemoryIndex::new();
        let failing = RecordingProvider { fail_on_call: Some(1), ..Default::default() };
        let cat = catalog(&["A", "B", "C", "D"]);

        assert!(compute_embeddings(&index, &failing, &cat, 2).await.is_err());
        assert_eq!(index.count().await.unwrap(), 2);

        let healthy = RecordingProvider::default();
        let report = compute_embeddings(&index, &healthy, &cat, 2).await.unwrap();
        assert_eq!(report.already_indexed, 2);
        assert_eq!(report.embedded, 2);
        assert_eq!(index.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn stores_metadata_and_source_text() {
        let index = InMemoryIndex::new();
        let provider = RecordingProvider::default();
        let cat: Catalog = vec![Service::new(
            "https://example.org/S1",
            "",
            "Pas",
            "Cestovní doklad",
            vec!["cestování".to_string()],
        )
        .unwrap()]
        .into_iter()
        .collect();

        compute_embeddings(&index, &provider, &cat, 500).await.unwrap();

        let record = index.get("S1").unwrap();
        assert_eq!(record.name, "Pas");
        assert_eq!(record.description, "Cestovní doklad");
        assert_eq!(record.document, "Pas. Cestovní doklad cestování");
    }

    #[tokio::test]
    async fn rebuild_reembeds_everything() {
        let index = InMemoryIndex::new();
        let provider = RecordingProvider::default();
        let cat = catalog(&["A", "B"]);
        compute_embeddings(&index, &provider, &cat, 500).await.unwrap();

        let report = rebuild_embeddings(&index, &provider, &cat, 500).await.unwrap();
        assert_eq!(report.embedded, 2);
        assert_eq!(index.count().await.unwrap(), 2);
    }

    /// Returns vectors of a fixed length regardless of what it declares.
    struct SizedProvider {
        declared: usize,
        actual: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for SizedProvider {
        fn model_name(&self) -> &str {
            "sized"
        }
        fn dims(&self) -> usize {
            self.declared
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; self.actual]).collect())
        }
    }

    #[tokio::test]
    async fn model_change_over_existing_index_is_rejected() {
        let index = InMemoryIndex::new();
        compute_embeddings(&index, &RecordingProvider::default(), &catalog(&["A"]), 500)
            .await
            .unwrap();

        let bigger = SizedProvider { declared: 3, actual: 3 };
        let err = compute_embeddings(&index, &bigger, &catalog(&["A", "B"]), 500)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rpp embed rebuild"));
        assert_eq!(index.count().await.unwrap(), 1);

        let report = rebuild_embeddings(&index, &bigger, &catalog(&["A", "B"]), 500)
            .await
            .unwrap();
        assert_eq!(report.embedded, 2);
        assert_eq!(index.dims().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn vectors_must_match_declared_dims() {
        let index = InMemoryIndex::new();
        let lying = SizedProvider { declared: 4, actual: 2 };
        assert!(compute_embeddings(&index, &lying, &catalog(&["A"]), 500).await.is_err());
        assert_eq!(index.count().await.unwrap(), 0);

        let undeclared = SizedProvider { declared: 0, actual: 2 };
        compute_embeddings(&index, &undeclared, &catalog(&["A"]), 500).await.unwrap();
        assert_eq!(index.dims().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn zero_batch_size_is_rejected() {
        let index = InMemoryIndex::new();
        let provider = RecordingProvider::default();
        assert!(compute_embeddings(&index, &provider, &catalog(&["A"]), 0).await.is_err());
    }
}
