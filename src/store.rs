//! The service store facade.
//!
//! [`ServiceStore`] owns the in-memory catalog and drives every operation
//! on it:
//!
//! ```text
//! load() ─▶ cache file? ──yes──▶ catalog
//!              │ no / unreadable
//!              ▼
//!          remote register ─▶ details merge ─▶ indexer ─▶ cache file
//!
//! search() ─▶ ensure_handles() ─▶ embed query ─▶ VectorIndex::query ─▶ catalog lookup
//! ```
//!
//! Search handles (vector index + embedding provider) are opened on first
//! use and released by [`close`](ServiceStore::close). Every remote call and
//! index operation is awaited before the next one starts.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use rpp_store_core::indexer::{self, IndexReport};
use rpp_store_core::search::{keyword_search, semantic_search};
use rpp_store_core::stats::EmbeddingStatistics;
use rpp_store_core::{Catalog, Service};

use crate::backend::{DefaultBackend, SearchHandles, SemanticBackend};
use crate::config::{Config, API_KEY_ENV};
use crate::error::StoreError;
use crate::sparql::{GraphSource, SparqlClient};
use crate::{catalog, details, steps};

pub struct ServiceStore {
    config: Config,
    catalog: Catalog,
    graph: Arc<dyn GraphSource>,
    backend: Arc<dyn SemanticBackend>,
    handles: Option<SearchHandles>,
    embeddings_computed: bool,
}

impl ServiceStore {
    /// Build a store talking to the configured SPARQL endpoint, SQLite
    /// index and embedding provider.
    ///
    /// With the `openai` provider a missing `OPENAI_API_KEY` fails here,
    /// before any operation runs.
    pub fn from_config(config: Config) -> Result<Self> {
        if config.embedding.provider == "openai" && !api_key_present() {
            return Err(StoreError::MissingApiKey(API_KEY_ENV).into());
        }
        let graph: Arc<dyn GraphSource> = Arc::new(SparqlClient::new(&config.sparql)?);
        let backend: Arc<dyn SemanticBackend> = Arc::new(DefaultBackend::new(config.clone()));
        Ok(Self::with_components(config, graph, backend))
    }

    /// Build a store from explicit components.
    pub fn with_components(
        config: Config,
        graph: Arc<dyn GraphSource>,
        backend: Arc<dyn SemanticBackend>,
    ) -> Self {
        Self {
            config,
            catalog: Catalog::new(),
            graph,
            backend,
            handles: None,
            embeddings_computed: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// (Re)load the catalog, from the cache file when it holds a valid,
    /// non-empty catalog, otherwise from the remote register.
    ///
    /// A remote load also merges the details file, indexes new services
    /// (failures logged, not fatal) and rewrites the cache. Fails with
    /// [`StoreError::CatalogUnavailable`] when the remote branch fails; the
    /// catalog is left empty in that case.
    pub async fn load(&mut self) -> Result<()> {
        self.catalog.clear();

        let cache_path = self.config.paths.cache.clone();
        if cache_path.exists() {
            match catalog::read_cache(&cache_path) {
                Ok(services) => self.catalog.extend(services),
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "ignoring unreadable catalog cache");
                    self.catalog.clear();
                }
            }
        }

        if !self.catalog.is_empty() {
            info!(services = self.catalog.len(), "loaded services from cache");
            return Ok(());
        }

        if let Err(e) = self.load_remote().await {
            self.catalog.clear();
            return Err(StoreError::CatalogUnavailable(e).into());
        }
        info!(services = self.catalog.len(), "loaded services from remote register");
        Ok(())
    }

    async fn load_remote(&mut self) -> Result<()> {
        let services = catalog::fetch_services(self.graph.as_ref()).await?;
        self.catalog.extend(services);

        details::merge_from_file(&mut self.catalog, &self.config.paths.details)?;

        if let Err(e) = self.compute_embeddings().await {
            warn!(
                error = %format!("{e:#}"),
                "failed to compute embeddings; semantic search unavailable until they are computed"
            );
        }

        catalog::write_cache(&self.config.paths.cache, &self.catalog)
    }

    /// Embed and index every catalog service missing from the index.
    pub async fn compute_embeddings(&mut self) -> Result<IndexReport> {
        if self.catalog.is_empty() {
            warn!("no services to compute embeddings for");
            return Ok(IndexReport::default());
        }

        let handles = self.ensure_handles().await?;
        let report = indexer::compute_embeddings(
            handles.index.as_ref(),
            handles.embedder.as_ref(),
            &self.catalog,
            self.config.embedding.batch_size,
        )
        .await?;
        self.embeddings_computed = true;

        debug!(
            already_indexed = report.already_indexed,
            embedded = report.embedded,
            batches = report.batches,
            "embedding index up to date"
        );
        Ok(report)
    }

    /// Clear the index and re-embed the whole catalog.
    pub async fn rebuild_embeddings(&mut self) -> Result<IndexReport> {
        let handles = self.ensure_handles().await?;
        self.embeddings_computed = false;
        let report = indexer::rebuild_embeddings(
            handles.index.as_ref(),
            handles.embedder.as_ref(),
            &self.catalog,
            self.config.embedding.batch_size,
        )
        .await?;
        self.embeddings_computed = true;
        Ok(report)
    }

    /// Up to `k` services semantically closest to `query`.
    pub async fn search(&mut self, query: &str, k: usize) -> Result<Vec<Service>> {
        if query.trim().is_empty() || k == 0 {
            debug!("empty query or zero limit; returning no results");
            return Ok(Vec::new());
        }
        let handles = self.ensure_handles().await?;
        semantic_search(
            handles.index.as_ref(),
            handles.embedder.as_ref(),
            &self.catalog,
            query,
            k,
        )
        .await
    }

    /// Up to `k` services matching the most query terms. Works without an
    /// index or embedding provider.
    pub fn keyword_search(&self, query: &str, k: usize) -> Vec<Service> {
        keyword_search(&self.catalog, query, k)
    }

    /// Detail text for service `id` from the details file, read afresh.
    pub fn get_detail_by_id(&self, id: &str) -> Result<Option<String>> {
        details::detail_by_id(&self.config.paths.details, id)
    }

    /// Digital data-box steps of service `id` from the remote register.
    pub async fn get_steps_by_id(&self, id: &str) -> Result<Vec<String>> {
        steps::steps_by_id(self.graph.as_ref(), id).await
    }

    /// Index coverage of the current catalog. Never fails: an unreachable
    /// index reports zero embeddings. An index that does not exist yet is
    /// reported empty and is not created.
    pub async fn embedding_statistics(&mut self) -> EmbeddingStatistics {
        let total_services = self.catalog.len();

        if self.handles.is_none() && !self.backend.index_exists() {
            debug!("no embedding index yet");
            return EmbeddingStatistics::new(self.embeddings_computed, 0, total_services);
        }

        let handles = match self.ensure_handles().await {
            Ok(handles) => handles,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "embedding statistics unavailable");
                return EmbeddingStatistics::unavailable(total_services);
            }
        };

        match handles.index.count().await {
            Ok(total_embeddings) => {
                EmbeddingStatistics::new(self.embeddings_computed, total_embeddings, total_services)
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "failed to count embeddings");
                EmbeddingStatistics::unavailable(total_services)
            }
        }
    }

    pub fn service(&self, id: &str) -> Option<&Service> {
        self.catalog.get(id)
    }

    /// All services in catalog order.
    pub fn services(&self) -> Vec<Service> {
        self.catalog.to_vec()
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Release the search handles. Later operations reopen them.
    pub async fn close(&mut self) {
        if let Some(handles) = self.handles.take() {
            handles.index.close().await;
            debug!("closed search handles");
        }
    }

    async fn ensure_handles(&mut self) -> Result<SearchHandles> {
        if let Some(handles) = &self.handles {
            return Ok(handles.clone());
        }
        let handles = self.backend.connect().await?;
        self.handles = Some(handles.clone());
        Ok(handles)
    }
}

fn api_key_present() -> bool {
    std::env::var(API_KEY_ENV)
        .map(|key| !key.trim().is_empty())
        .unwrap_or(false)
}
