//! Configuration parsing and validation.
//!
//! All settings live in one [`Config`] value built once at startup by
//! [`load_config`] and handed to the store by value. The TOML file is
//! optional: a missing file yields the defaults below. Environment
//! variables are applied on top:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `EMBEDDINGS_MODEL` | Overrides `embedding.model` |
//! | `OPENAI_API_KEY` | Required by the `openai` provider (read at store construction) |
//!
//! ```toml
//! [paths]
//! cache = "data/government_services_data.json"
//! details = "data/detailni-popis-sluzby-vs.json"
//! index = "data/index/embeddings.sqlite"
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! batch_size = 500
//! # dims = 512          # shortened OpenAI output; changing it needs a rebuild
//!
//! [sparql]
//! endpoint = "https://rpp-opendata.egon.gov.cz/odrpp/sparql/"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use rpp_store_core::indexer::DEFAULT_BATCH_SIZE;

/// Environment variable overriding the embedding model.
pub const MODEL_ENV: &str = "EMBEDDINGS_MODEL";
/// Environment variable holding the OpenAI API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub sparql: SparqlConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// JSON cache of the loaded catalog.
    #[serde(default = "default_cache_path")]
    pub cache: PathBuf,
    /// Auxiliary service-details dataset.
    #[serde(default = "default_details_path")]
    pub details: PathBuf,
    /// SQLite file backing the vector index.
    #[serde(default = "default_index_path")]
    pub index: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache: default_cache_path(),
            details: default_details_path(),
            index: default_index_path(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/government_services_data.json")
}
fn default_details_path() -> PathBuf {
    PathBuf::from("data/detailni-popis-sluzby-vs.json")
}
fn default_index_path() -> PathBuf {
    PathBuf::from("data/index/embeddings.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Output dimensionality requested from the model (OpenAI
    /// `dimensions`). Unset means the model's native size.
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            api_base: default_api_base(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SparqlConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_sparql_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SparqlConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_sparql_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "https://rpp-opendata.egon.gov.cz/odrpp/sparql/".to_string()
}
fn default_sparql_timeout_secs() -> u64 {
    60
}

/// Load configuration from `path` (defaults when the file does not
/// exist), apply environment overrides, and validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        Config::default()
    };

    if let Ok(model) = std::env::var(MODEL_ENV) {
        if !model.trim().is_empty() {
            config.embedding.model = model;
        }
    }

    validate(&config)?;
    Ok(config)
}

/// Parse a TOML document into a [`Config`] without environment overrides.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

fn validate(config: &Config) -> Result<()> {
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }
    if config.embedding.model.trim().is_empty() {
        bail!("embedding.model must not be empty");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or local.",
            other
        ),
    }

    if config.sparql.endpoint.trim().is_empty() {
        bail!("sparql.endpoint must not be empty");
    }
    Ok(())
}
