//! Embedder client abstraction.
//!
//! # Implementations
//! - [`openai::OpenAiEmbedder`]: OpenAI embeddings API via `async-openai`.
//! - [`hashed::HashedEmbedder`]: deterministic local pseudo-embeddings for
//!   development and tests; carries no semantic signal.

pub mod hashed;
pub mod openai;

use std::future::Future;

use crate::errors::Result;

/// A vector embedding (f32 components).
pub type Embedding = Vec<f32>;

/// Trait for text-to-vector embedding clients.
pub trait EmbedderClient: Send + Sync {
    /// Generate an embedding for a single text string.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Embedding>> + Send;

    /// Generate embeddings for a batch of texts, one per input, in order.
    fn embed_batch(&self, texts: &[&str]) -> impl Future<Output = Result<Vec<Embedding>>> + Send;

    /// Returns the dimensionality of embeddings produced by this client.
    fn dim(&self) -> usize;

    /// Model identifier reported by health checks.
    fn model(&self) -> &str;
}
