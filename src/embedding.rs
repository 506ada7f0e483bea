//! Embedding provider implementations.
//!
//! Concrete backends for [`rpp_store_core::embedding::EmbeddingProvider`]:
//! - **[`DisabledProvider`]**: refuses every call; used when
//!   `embedding.provider = "disabled"`.
//! - **[`OpenAIProvider`]**: calls `POST {api_base}/embeddings` with retry and
//!   backoff.
//! - **`LocalProvider`**: runs a fastembed model in process (feature
//!   `local-embeddings`).
//!
//! # Retry Strategy
//!
//! The OpenAI provider uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use rpp_store_core::embedding::EmbeddingProvider;

use crate::config::{EmbeddingConfig, API_KEY_ENV};
use crate::error::StoreError;

// ============ Disabled Provider ============

/// A provider that always fails. Semantic search and indexing report an
/// error; keyword search and lookups keep working.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled")
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// The API key is read once from `OPENAI_API_KEY` at construction; its
/// absence is a [`StoreError::MissingApiKey`].
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    /// Sent as `dimensions` when the config shortens the model output.
    requested_dims: Option<usize>,
    endpoint: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(StoreError::MissingApiKey(API_KEY_ENV))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            model: config.model.clone(),
            dims: config.dims.unwrap_or_else(|| openai_dims(&config.model)),
            requested_dims: config.dims,
            endpoint: format!("{}/embeddings", config.api_base.trim_end_matches('/')),
            api_key,
            max_retries: config.max_retries,
            client,
        })
    }
}

/// Known output sizes of the OpenAI embedding models; `0` when unknown.
fn openai_dims(model: &str) -> usize {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        "text-embedding-3-large" => 3072,
        _ => 0,
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = embeddings_request(&self.model, self.requested_dims, texts);

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!(attempt, delay_secs = delay.as_secs(), "retrying embedding request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let raw = response.text().await?;
                        let embeddings = parse_openai_response(&raw)?;
                        if embeddings.len() != texts.len() {
                            bail!(
                                "OpenAI returned {} embeddings for {} inputs",
                                embeddings.len(),
                                texts.len()
                            );
                        }
                        return Ok(embeddings);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Embedding failed after retries")))
    }
}

/// Request body for `POST /embeddings`.
fn embeddings_request(
    model: &str,
    dimensions: Option<usize>,
    texts: &[String],
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "input": texts,
    });
    if let Some(dimensions) = dimensions {
        body["dimensions"] = dimensions.into();
    }
    body
}

#[derive(Deserialize)]
struct OpenAIResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Parse an embeddings response body, ordering vectors by their `index`.
fn parse_openai_response(raw: &str) -> Result<Vec<Vec<f32>>> {
    let mut parsed: OpenAIResponse =
        serde_json::from_str(raw).context("Invalid OpenAI response")?;
    parsed.data.sort_by_key(|item| item.index);
    Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
}

// ============ Local Provider ============

/// In-process embeddings via fastembed. The model is downloaded from
/// Hugging Face on first use and cached.
#[cfg(feature = "local-embeddings")]
pub struct LocalProvider {
    model_name: String,
    model: fastembed::EmbeddingModel,
    dims: usize,
    batch_size: usize,
}

#[cfg(feature = "local-embeddings")]
impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (model, dims) = fastembed_model(&config.model)?;
        if let Some(requested) = config.dims {
            if requested != dims {
                bail!(
                    "Local model '{}' produces {}-dimensional vectors; embedding.dims = {} is not supported",
                    config.model,
                    dims,
                    requested
                );
            }
        }
        Ok(Self {
            model_name: config.model.clone(),
            model,
            dims,
            batch_size: config.batch_size,
        })
    }
}

#[cfg(feature = "local-embeddings")]
fn fastembed_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
    use fastembed::EmbeddingModel;
    match name {
        "multilingual-e5-small" => Ok((EmbeddingModel::MultilingualE5Small, 384)),
        "multilingual-e5-base" => Ok((EmbeddingModel::MultilingualE5Base, 768)),
        "multilingual-e5-large" => Ok((EmbeddingModel::MultilingualE5Large, 1024)),
        "paraphrase-multilingual-mpnet-base-v2" => {
            Ok((EmbeddingModel::ParaphraseMLMpnetBaseV2, 768))
        }
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large, \
             paraphrase-multilingual-mpnet-base-v2",
            other
        ),
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(model).with_show_download_progress(false),
            )
            .map_err(|e| anyhow!("Failed to initialize local embedding model: {}", e))?;

            model
                .embed(texts, Some(batch_size))
                .map_err(|e| anyhow!("Local embedding failed: {}", e))
        })
        .await?
    }
}

/// Create the [`EmbeddingProvider`] named by `embedding.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"local"` | `LocalProvider` (feature `local-embeddings`) |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Box::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_orders_by_index() {
        let raw = r#"{
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.5]}
            ],
            "model": "text-embedding-3-small"
        }"#;
        let vectors = parse_openai_response(raw).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.5], vec![0.0, 1.0]]);
    }

    #[test]
    fn parse_rejects_missing_data() {
        assert!(parse_openai_response(r#"{"error": {"message": "bad"}}"#).is_err());
    }

    #[test]
    fn known_model_dims() {
        assert_eq!(openai_dims("text-embedding-3-small"), 1536);
        assert_eq!(openai_dims("text-embedding-3-large"), 3072);
        assert_eq!(openai_dims("custom"), 0);
    }

    #[test]
    fn request_carries_configured_dimensions() {
        let texts = vec!["pas".to_string()];
        let body = embeddings_request("text-embedding-3-small", Some(512), &texts);
        assert_eq!(body["dimensions"], 512);
        assert_eq!(body["input"][0], "pas");

        let body = embeddings_request("text-embedding-3-small", None, &texts);
        assert!(body.get("dimensions").is_none());
    }

    #[tokio::test]
    async fn disabled_provider_refuses() {
        let config = EmbeddingConfig {
            provider: "disabled".to_string(),
            ..EmbeddingConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "disabled");
        assert!(provider.embed(&["x".to_string()]).await.is_err());
    }
}
