//! OpenAI embedding client.
//!
//! Inputs are sent in chunks of at most [`BATCH_CHUNK_SIZE`]; connection and
//! timeout failures are retried with exponential backoff.

use std::time::Duration;

use async_openai::{config::OpenAIConfig, error::OpenAIError, types::CreateEmbeddingRequestArgs, Client};
use backoff::{future::retry, ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::{debug, warn};

use crate::embedder::{EmbedderClient, Embedding};
use crate::errors::{GraphError, Result};

/// Default embedding model name.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Maximum number of inputs per OpenAI embeddings API call.
const BATCH_CHUNK_SIZE: usize = 2048;

/// Known output width for `model`; unrecognised models fall back to 1536.
fn model_dim(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

fn retry_policy() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(500))
        .with_max_interval(Duration::from_secs(10))
        .with_max_elapsed_time(Some(Duration::from_secs(60)))
        .build()
}

/// Network-level failures are worth another attempt; everything else is final.
fn classify(err: OpenAIError) -> backoff::Error<GraphError> {
    let transient = matches!(&err, OpenAIError::Reqwest(e) if e.is_timeout() || e.is_connect());
    let err = GraphError::Embedder(err.to_string());
    if transient {
        warn!(error = %err, "embedding request failed, retrying");
        backoff::Error::transient(err)
    } else {
        backoff::Error::permanent(err)
    }
}

/// OpenAI embedding client that implements [`EmbedderClient`].
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dim: usize,
}

impl OpenAiEmbedder {
    /// Create an embedder against the public OpenAI endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::from_config(OpenAIConfig::new().with_api_key(api_key.into()), model.into())
    }

    /// Create an embedder against an OpenAI-compatible endpoint.
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.into())
            .with_api_base(base_url.into());
        Self::from_config(config, model.into())
    }

    /// Override the reported dimension (for models with a configurable width).
    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    fn from_config(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            dim: model_dim(&model),
            model,
        }
    }

    async fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let input: Vec<String> = texts.iter().map(|s| (*s).to_owned()).collect();
        debug!(count = input.len(), model = %self.model, "requesting embeddings");

        retry(retry_policy(), || async {
            let request = CreateEmbeddingRequestArgs::default()
                .model(self.model.as_str())
                .input(input.clone())
                .build()
                .map_err(|e| backoff::Error::permanent(GraphError::Embedder(e.to_string())))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(classify)?;

            let embeddings: Vec<Embedding> = response
                .data
                .into_iter()
                .map(|item| item.embedding)
                .collect();
            Ok(embeddings)
        })
        .await
    }
}

impl EmbedderClient for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_chunk(&[text])
            .await?
            .pop()
            .ok_or_else(|| GraphError::Embedder("empty response from embedding API".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_CHUNK_SIZE) {
            let embeddings = self.embed_chunk(chunk).await?;
            if embeddings.len() != chunk.len() {
                return Err(GraphError::Embedder(format!(
                    "expected {} embeddings, got {}",
                    chunk.len(),
                    embeddings.len()
                )));
            }
            out.extend(embeddings);
        }
        Ok(out)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn model(&self) -> &str {
        &self.model
    }
}
