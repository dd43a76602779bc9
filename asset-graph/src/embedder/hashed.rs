//! Deterministic hash-based embedder.
//!
//! Each token is hashed into a handful of buckets and the result L2-normalized,
//! so texts sharing tokens land close together. There is no semantic signal:
//! "spindle" and "shaft" are unrelated here.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::embedder::{EmbedderClient, Embedding};
use crate::errors::Result;
use crate::utils::{normalize_l2, tokenize};

pub const DEFAULT_DIM: usize = 384;

/// Tokens beyond this count are ignored.
const MAX_TOKENS: usize = 1_000;

#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dim: usize,
}

impl HashedEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_sync(&self, text: &str) -> Embedding {
        let mut v = vec![0.0_f32; self.dim];
        for token in tokenize(text).into_iter().take(MAX_TOKENS) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();
            for j in 0..4 {
                let idx = (hash >> (j * 16)) as usize % self.dim;
                let sign = if (hash >> (j + 60)) & 1 == 0 { 1.0 } else { -1.0 };
                v[idx] += sign;
            }
        }
        normalize_l2(&mut v);
        v
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl EmbedderClient for HashedEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn model(&self) -> &str {
        "hashed"
    }
}
