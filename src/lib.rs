//! # RPP Store
//!
//! A searchable store of Czech public administration services, built from
//! the public services register (RPP).
//!
//! The catalog comes from a local JSON cache or, when the cache is missing
//! or unreadable, from the register's SPARQL endpoint. Remote loads are
//! enriched from an auxiliary details dataset, embedded, and indexed in a
//! persistent SQLite vector index for semantic search.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Cache / RPP  │──▶│ Details merge│──▶│   Indexer    │
//! │   SPARQL     │   │  (optional)  │   │ embed+SQLite │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │
//!                         ┌────────────────────┤
//!                         ▼                    ▼
//!                   ┌──────────┐        ┌────────────┐
//!                   │   CLI    │        │ Library API│
//!                   │  (rpp)   │        │ServiceStore│
//!                   └──────────┘        └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rpp load                         # cache or remote register
//! rpp search "cestovní pas"        # semantic search
//! rpp search "pas" --mode keyword  # term matching, no embeddings
//! rpp detail S1234                 # details text block
//! rpp steps S1234                  # digital data-box steps
//! rpp stats                        # embedding coverage
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`store`] | The [`ServiceStore`](store::ServiceStore) facade |
//! | [`catalog`] | Cache file I/O and remote catalog fetch |
//! | [`details`] | Details file access |
//! | [`steps`] | Service steps lookup |
//! | [`sparql`] | SPARQL client and query builders |
//! | [`embedding`] | Embedding providers |
//! | [`sqlite_index`] | SQLite vector index |
//! | [`backend`] | Lazily opened search handles |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`error`] | Named store errors |

pub mod backend;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod db;
pub mod details;
pub mod embedding;
pub mod error;
pub mod migrate;
pub mod sparql;
pub mod sqlite_index;
pub mod steps;
pub mod store;

pub use error::StoreError;
pub use store::ServiceStore;
