//! # RPP Store Core
//!
//! Shared logic for the RPP service store: the service model and catalog
//! snapshot, identifier normalization, the auxiliary details schema, the
//! vector index abstraction, the incremental embedding indexer, and search.
//!
//! This crate contains no tokio runtime, sqlx, HTTP client, or filesystem
//! I/O. Everything that touches the network or disk lives in the
//! `rpp-store` app crate and reaches this crate through the
//! [`embedding::EmbeddingProvider`] and [`index::VectorIndex`] traits.

pub mod details;
pub mod embedding;
pub mod ident;
pub mod index;
pub mod indexer;
pub mod models;
pub mod search;
pub mod stats;
pub mod text;

pub use models::{Catalog, EmbeddingRecord, IndexHit, Service, ServiceError};
