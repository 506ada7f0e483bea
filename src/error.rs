//! Named failures of the store.
//!
//! These are the conditions that leave a caller without an answer: no
//! credentials, no catalog, or no steps. They are returned inside
//! [`anyhow::Error`] like every other error and can be recovered with
//! `err.downcast_ref::<StoreError>()`. Recoverable conditions (corrupt
//! cache, missing details file, failed indexing) are logged instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} environment variable is not set")]
    MissingApiKey(&'static str),
    #[error("failed to load services from both the local cache and the remote source")]
    CatalogUnavailable(#[source] anyhow::Error),
    #[error("failed to retrieve steps for service {id}")]
    StepsQuery {
        id: String,
        #[source]
        source: anyhow::Error,
    },
}
