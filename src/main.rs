//! # RPP Store CLI (`rpp`)
//!
//! Loads the catalog of Czech public administration services and answers
//! search, detail and steps queries against it.
//!
//! ## Usage
//!
//! ```bash
//! rpp --config ./config/rpp.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rpp load` | Load the catalog (cache or remote) and refresh the cache |
//! | `rpp search "<query>"` | Semantic (default) or keyword search |
//! | `rpp get <id>` | Print one service from the catalog |
//! | `rpp detail <id>` | Print the details text block for a service |
//! | `rpp steps <id>` | List a service's digital data-box steps |
//! | `rpp stats` | Embedding coverage of the catalog |
//! | `rpp embed pending` | Embed services missing from the index |
//! | `rpp embed rebuild` | Clear the index and re-embed everything |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `rpp_store=info`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rpp_store::commands;
use rpp_store::config;
use rpp_store::ServiceStore;

/// RPP Store: searchable catalog of Czech public administration services.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "rpp",
    about = "Searchable catalog of Czech public administration services",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rpp.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the catalog and write the cache.
    ///
    /// Uses the cache file when it is valid; otherwise queries the remote
    /// register, merges the details file and indexes new services.
    Load,

    /// Search services.
    Search {
        /// The search query string.
        query: String,

        /// Search mode: `semantic` (vector index) or `keyword` (term matching).
        #[arg(long, default_value = "semantic")]
        mode: String,

        /// Maximum number of results to return.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Print a service from the catalog.
    Get {
        /// Service id (e.g. `S1234`).
        id: String,
    },

    /// Print the details text block for a service.
    Detail {
        /// Service id.
        id: String,
    },

    /// List a service's digital steps completable through a data box.
    Steps {
        /// Service id.
        id: String,
    },

    /// Show embedding coverage.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage embedding vectors.
    Embed {
        #[command(subcommand)]
        action: EmbedAction,
    },
}

#[derive(Subcommand)]
enum EmbedAction {
    /// Embed services that are not yet in the index.
    Pending {
        /// Override the batch size from config (texts per API call).
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Delete and regenerate all embeddings.
    ///
    /// Useful when switching embedding models or after the catalog text
    /// changed.
    Rebuild {
        /// Override the batch size from config (texts per API call).
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rpp_store=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load_config(&cli.config)?;

    if let Commands::Embed {
        action: EmbedAction::Pending { batch_size } | EmbedAction::Rebuild { batch_size },
    } = &cli.command
    {
        if let Some(size) = batch_size {
            if *size == 0 {
                anyhow::bail!("--batch-size must be > 0");
            }
            cfg.embedding.batch_size = *size;
        }
    }

    let mut store = ServiceStore::from_config(cfg)?;

    let result = match cli.command {
        Commands::Load => commands::run_load(&mut store).await,
        Commands::Search { query, mode, limit } => {
            commands::run_search(&mut store, &query, &mode, limit).await
        }
        Commands::Get { id } => commands::run_get(&mut store, &id).await,
        Commands::Detail { id } => commands::run_detail(&store, &id),
        Commands::Steps { id } => commands::run_steps(&store, &id).await,
        Commands::Stats { json } => commands::run_stats(&mut store, json).await,
        Commands::Embed { action } => match action {
            EmbedAction::Pending { .. } => commands::run_embed_pending(&mut store).await,
            EmbedAction::Rebuild { .. } => commands::run_embed_rebuild(&mut store).await,
        },
    };

    store.close().await;
    result
}
