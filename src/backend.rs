//! Search handles and the backends that open them.
//!
//! Semantic search, indexing and statistics all need the same pair of
//! handles: a [`VectorIndex`] and an [`EmbeddingProvider`]. The store opens
//! them lazily through a [`SemanticBackend`] and drops them on `close`.
//!
//! ```text
//! ServiceStore ──ensure_handles()──▶ SemanticBackend::connect()
//!                                      ├─ DefaultBackend: SqliteIndex + configured provider
//!                                      └─ StaticBackend:  pre-built handles (tests, embedding apps)
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use rpp_store_core::embedding::EmbeddingProvider;
use rpp_store_core::index::VectorIndex;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::sqlite_index::SqliteIndex;

/// An open vector index together with the provider used to fill and query it.
#[derive(Clone)]
pub struct SearchHandles {
    pub index: Arc<dyn VectorIndex>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

/// Opens [`SearchHandles`] on demand.
#[async_trait]
pub trait SemanticBackend: Send + Sync {
    async fn connect(&self) -> Result<SearchHandles>;

    /// Whether an index already exists. `false` lets read-only callers
    /// report an empty index without creating one.
    fn index_exists(&self) -> bool {
        true
    }
}

/// SQLite index at `paths.index` plus the provider named in `[embedding]`.
pub struct DefaultBackend {
    config: Config,
}

impl DefaultBackend {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SemanticBackend for DefaultBackend {
    async fn connect(&self) -> Result<SearchHandles> {
        let embedder: Arc<dyn EmbeddingProvider> = create_provider(&self.config.embedding)?.into();
        let index = SqliteIndex::open(&self.config.paths.index, embedder.model_name()).await?;
        Ok(SearchHandles {
            index: Arc::new(index),
            embedder,
        })
    }

    fn index_exists(&self) -> bool {
        self.config.paths.index.exists()
    }
}

/// Hands out the same pre-built handles on every connect.
pub struct StaticBackend {
    handles: SearchHandles,
}

impl StaticBackend {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            handles: SearchHandles { index, embedder },
        }
    }
}

#[async_trait]
impl SemanticBackend for StaticBackend {
    async fn connect(&self) -> Result<SearchHandles> {
        Ok(self.handles.clone())
    }
}
