//! OpenAI LLM client implementation.
//!
//! Uses `async-openai` for API calls, `moka` for response caching, and
//! `backoff` for exponential-backoff retry on rate limits / transient errors.

use std::time::Duration;

use async_openai::{config::OpenAIConfig, error::OpenAIError, Client};
use backoff::ExponentialBackoffBuilder;
use md5::{Digest, Md5};
use moka::future::Cache;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::{GraphError, LlmError, Result};

use super::{LlmClient, Message};

// ── Cache configuration ───────────────────────────────────────────────────────

/// Configuration for the in-process response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries held in memory.
    pub max_capacity: u64,
    /// How long each entry lives before eviction.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1_000,
            ttl: Duration::from_secs(3_600),
        }
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// OpenAI chat client implementing [`LlmClient`].
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retry_elapsed: Duration,
    /// `md5(model + messages)` → reply text.
    cache: Cache<String, String>,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, cache: CacheConfig) -> Self {
        Self::from_config(OpenAIConfig::new().with_api_key(api_key), model, cache)
    }

    /// Create a client against an OpenAI-compatible endpoint.
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        cache: CacheConfig,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self::from_config(config, model, cache)
    }

    fn from_config(config: OpenAIConfig, model: impl Into<String>, cache: CacheConfig) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            temperature: 0.0,
            max_tokens: 4_096,
            max_retry_elapsed: Duration::from_secs(300),
            cache: Cache::builder()
                .max_capacity(cache.max_capacity)
                .time_to_live(cache.ttl)
                .build(),
        }
    }

    /// Override the max output token limit (default `4096`).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Cap the total time spent retrying one request (default 5 minutes).
    pub fn with_max_retry_elapsed(mut self, limit: Duration) -> Self {
        self.max_retry_elapsed = limit;
        self
    }

    fn cache_key(&self, messages: &[Message]) -> String {
        let mut h = Md5::new();
        h.update(self.model.as_bytes());
        for m in messages {
            h.update([0u8]);
            h.update(m.role.as_str().as_bytes());
            h.update([0u8]);
            h.update(m.content.as_bytes());
        }
        format!("{:x}", h.finalize())
    }

    fn request_body(&self, messages: &[Message]) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }

    /// POST to chat completions, retrying 429s and 5xx responses.
    async fn call_with_retry(&self, request: serde_json::Value) -> Result<serde_json::Value> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(60))
            .with_max_elapsed_time(Some(self.max_retry_elapsed))
            .build();

        backoff::future::retry(policy, || async {
            let outcome: std::result::Result<serde_json::Value, OpenAIError> =
                self.client.chat().create_byot(request.clone()).await;

            outcome.map_err(|e| {
                let err = map_openai_error(e);
                match &err {
                    LlmError::RateLimit => {
                        warn!(model = %self.model, "rate limited, backing off");
                        backoff::Error::transient(err)
                    }
                    LlmError::Api { status, .. } if *status >= 500 => {
                        warn!(model = %self.model, status = *status, "transient server error, backing off");
                        backoff::Error::transient(err)
                    }
                    _ => backoff::Error::permanent(err),
                }
            })
        })
        .await
        .map_err(GraphError::Llm)
    }
}

impl LlmClient for OpenAiClient {
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let key = self.cache_key(messages);
        if let Some(cached) = self.cache.get(&key).await {
            debug!(model = %self.model, "LLM cache hit");
            return Ok(cached);
        }

        let response = self.call_with_retry(self.request_body(messages)).await?;
        let choice = &response["choices"][0];
        if choice["message"]["refusal"].as_str().is_some() {
            return Err(LlmError::Refusal.into());
        }
        let content = choice["message"]["content"]
            .as_str()
            .filter(|c| !c.trim().is_empty())
            .map(ToOwned::to_owned)
            .ok_or(LlmError::EmptyResponse)?;

        self.cache.insert(key, content.clone()).await;
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Map an [`OpenAIError`] onto the crate's [`LlmError`].
fn map_openai_error(err: OpenAIError) -> LlmError {
    match err {
        OpenAIError::ApiError(api_err) => match api_err.code.as_deref() {
            Some("invalid_api_key") => LlmError::Authentication,
            Some("rate_limit_exceeded") => LlmError::RateLimit,
            _ => LlmError::Api {
                status: status_from_type(api_err.r#type.as_deref()),
                message: api_err.message,
            },
        },
        other => LlmError::Api {
            status: 0,
            message: other.to_string(),
        },
    }
}

/// Best-effort HTTP status recovered from the error `type` field.
fn status_from_type(kind: Option<&str>) -> u16 {
    match kind {
        Some("authentication_error") => 401,
        Some("invalid_request_error") => 400,
        Some("server_error") => 500,
        _ => 0,
    }
}
