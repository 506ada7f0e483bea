//! Semantic and keyword search over the catalog.
//!
//! Semantic search embeds the query once, asks the [`VectorIndex`] for the
//! `k` nearest records, and maps the returned ids back to catalog
//! services. Ids the index knows but the catalog no longer holds are
//! dropped, so a result can be shorter than `k`.
//!
//! Keyword search needs neither the index nor an embedding provider: it
//! ranks services by how many query terms appear in their text.

use std::collections::HashSet;

use anyhow::Result;
use tracing::debug;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::index::VectorIndex;
use crate::models::{Catalog, IndexHit, Service};

/// Up to `k` services nearest to `query`, most similar first.
///
/// An empty or whitespace-only query returns an empty result without
/// touching the provider or the index. A query vector whose length differs
/// from the indexed vectors is an error, never a ranking.
pub async fn semantic_search(
    index: &dyn VectorIndex,
    provider: &dyn EmbeddingProvider,
    catalog: &Catalog,
    query: &str,
    k: usize,
) -> Result<Vec<Service>> {
    if query.trim().is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    let query_vec = embed_query(provider, query).await?;
    let hits = index.query(&query_vec, k).await?;
    Ok(resolve_hits(catalog, &hits))
}

/// Map index hits to catalog services, preserving hit order and skipping
/// ids that are not in the catalog.
pub fn resolve_hits(catalog: &Catalog, hits: &[IndexHit]) -> Vec<Service> {
    hits.iter()
        .filter_map(|hit| {
            let found = catalog.get(&hit.id).cloned();
            if found.is_none() {
                debug!(id = %hit.id, "dropping stale index hit");
            }
            found
        })
        .collect()
}

/// Up to `k` services ranked by the number of distinct query terms
/// (case-insensitive) found in name, description or keywords.
///
/// Ties keep catalog order. Services matching no term are excluded.
pub fn keyword_search(catalog: &Catalog, query: &str, k: usize) -> Vec<Service> {
    let query_lower = query.to_lowercase();
    let terms: HashSet<&str> = query_lower.split_whitespace().collect();
    if terms.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &Service)> = catalog
        .iter()
        .filter_map(|service| {
            let haystack = format!(
                "{} {} {}",
                service.name,
                service.description,
                service.keywords.join(" ")
            )
            .to_lowercase();
            let matches = terms.iter().filter(|t| haystack.contains(*t)).count();
            (matches > 0).then_some((matches, service))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(k).map(|(_, s)| s.clone()).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::index::memory::InMemoryIndex;
    use crate::models::EmbeddingRecord;

    /// Maps a handful of words onto fixed axes.
    #[derive(Default)]
    struct AxisProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for AxisProvider {
        fn model_name(&self) -> &str {
            "axis"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "pas" => vec![1.0, 0.0, 0.0],
                    "auto" => vec![0.0, 1.0, 0.0],
                    _ => vec![0.0, 0.0, 1.0],
                })
                .collect())
        }
    }

    fn service(id: &str, name: &str, description: &str) -> Service {
        Service::new(format!("https://example.org/{id}"), "", name, description, vec![]).unwrap()
    }

    fn record(id: &str, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.to_string(),
            vector,
            name: String::new(),
            description: String::new(),
            document: String::new(),
        }
    }

    async fn fixture() -> (Catalog, InMemoryIndex) {
        let catalog: Catalog = vec![
            service("S1", "Cestovní pas", ""),
            service("S2", "Registrace vozidla", ""),
            service("S3", "Rybářský lístek", ""),
        ]
        .into_iter()
        .collect();
        let index = InMemoryIndex::new();
        index
            .add(&[
                record("S1", vec![0.9, 0.1, 0.0]),
                record("S2", vec![0.1, 0.9, 0.0]),
                record("S3", vec![0.0, 0.2, 0.9]),
            ])
            .await
            .unwrap();
        (catalog, index)
    }

    #[tokio::test]
    async fn empty_query_skips_embedding_and_index() {
        let (catalog, index) = fixture().await;
        let provider = AxisProvider::default();
        assert!(semantic_search(&index, &provider, &catalog, "", 5).await.unwrap().is_empty());
        assert!(semantic_search(&index, &provider, &catalog, "   ", 5).await.unwrap().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn returns_nearest_first_within_bound() {
        let (catalog, index) = fixture().await;
        let provider = AxisProvider::default();
        let results = semantic_search(&index, &provider, &catalog, "auto", 2).await.unwrap();
        let ids: Vec<&str> = results.iter().map(Service::id).collect();
        assert_eq!(ids, vec!["S2", "S3"]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn returns_all_when_fewer_than_k() {
        let (catalog, index) = fixture().await;
        let provider = AxisProvider::default();
        let results = semantic_search(&index, &provider, &catalog, "pas", 10).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id(), "S1");
    }

    #[tokio::test]
    async fn stale_ids_are_dropped() {
        let (mut catalog, index) = fixture().await;
        catalog.clear();
        catalog.insert(service("S2", "Registrace vozidla", ""));
        let provider = AxisProvider::default();

        let results = semantic_search(&index, &provider, &catalog, "pas", 3).await.unwrap();
        let ids: Vec<&str> = results.iter().map(Service::id).collect();
        assert_eq!(ids, vec!["S2"]);
    }

    #[tokio::test]
    async fn query_from_another_model_fails_loudly() {
        struct FlatProvider;

        #[async_trait]
        impl EmbeddingProvider for FlatProvider {
            fn model_name(&self) -> &str {
                "flat"
            }
            fn dims(&self) -> usize {
                2
            }
            async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
                Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
            }
        }

        let (catalog, index) = fixture().await;
        let err = semantic_search(&index, &FlatProvider, &catalog, "pas", 2)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rpp embed rebuild"));
    }

    #[test]
    fn keyword_search_ranks_by_matching_terms() {
        let mut catalog: Catalog = vec![
            service("S1", "Vydání občanského průkazu", "Doklad totožnosti"),
            service("S2", "Vydání cestovního pasu", "Cestovní doklad"),
            service("S3", "Rybářský lístek", ""),
        ]
        .into_iter()
        .collect();
        catalog.get_mut("S3").unwrap().keywords.push("Doklad".to_string());

        let results = keyword_search(&catalog, "vydání DOKLAD", 10);
        let ids: Vec<&str> = results.iter().map(Service::id).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3"]);

        assert_eq!(keyword_search(&catalog, "cestovní", 10).len(), 1);
        assert!(keyword_search(&catalog, "  ", 10).is_empty());
        assert_eq!(keyword_search(&catalog, "doklad", 1).len(), 1);
    }
}
