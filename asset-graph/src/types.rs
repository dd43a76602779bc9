//! Shared configuration types.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{GraphError, Result};

/// Partition used when neither the request nor the environment names one.
pub const DEFAULT_GROUP_ID: &str = "default";

/// Graph-store and model configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GraphConfig {
    /// Neo4j connection URI (e.g. `bolt://localhost:7687`).
    #[validate(length(min = 1))]
    pub neo4j_uri: String,

    /// Neo4j username.
    pub neo4j_user: String,

    /// Neo4j password.
    #[serde(skip_serializing)]
    #[validate(length(min = 1))]
    pub neo4j_password: String,

    /// Neo4j database name; the server default is used when absent.
    pub neo4j_database: Option<String>,

    /// OpenAI API key.
    #[serde(skip_serializing)]
    #[validate(length(min = 1))]
    pub openai_api_key: String,

    /// Alternative OpenAI-compatible API base URL.
    pub openai_base_url: Option<String>,

    /// Model used for entity/relationship extraction.
    pub model_name: String,

    /// Smaller/cheaper LLM model name.
    pub small_model_name: String,

    /// Embedding model name.
    pub embedding_model: String,

    /// Embedding vector dimension.
    #[validate(range(min = 1))]
    pub embedding_dim: usize,

    /// Optional group ID for partitioning graph data.
    pub group_id: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            neo4j_uri: "bolt://localhost:7687".to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password: String::new(),
            neo4j_database: None,
            openai_api_key: String::new(),
            openai_base_url: None,
            model_name: "gpt-4o".to_string(),
            small_model_name: "gpt-4.1-nano".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dim: 1536,
            group_id: None,
        }
    }
}

impl GraphConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` first (non-fatal if `.env` is absent),
    /// then reads each variable from the process environment. Required variables
    /// (`NEO4J_PASSWORD`, `OPENAI_API_KEY`) return a [`GraphError::Validation`]
    /// error when absent or empty.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required = |key: &str| {
            var(key).ok_or_else(|| GraphError::Validation(format!("{key} is required")))
        };

        let embedding_dim = match var("EMBEDDING_DIM") {
            Some(val) => val.trim().parse::<usize>().map_err(|_| {
                GraphError::Validation("EMBEDDING_DIM must be a positive integer".to_string())
            })?,
            None => defaults.embedding_dim,
        };

        let config = Self {
            neo4j_uri: var("NEO4J_URI").unwrap_or(defaults.neo4j_uri),
            neo4j_user: var("NEO4J_USER").unwrap_or(defaults.neo4j_user),
            neo4j_password: required("NEO4J_PASSWORD")?,
            neo4j_database: var("NEO4J_DATABASE"),
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: var("OPENAI_BASE_URL"),
            model_name: var("MODEL_NAME").unwrap_or(defaults.model_name),
            small_model_name: var("SMALL_MODEL_NAME").unwrap_or(defaults.small_model_name),
            embedding_model: var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dim,
            group_id: var("GROUP_ID"),
        };

        config.validate().map_err(|e| {
            if e.field_errors().contains_key("embedding_dim") {
                GraphError::Validation("EMBEDDING_DIM must be greater than zero".to_string())
            } else {
                GraphError::Validation(e.to_string())
            }
        })?;

        Ok(config)
    }

    /// The partition used for writes and searches when a request names none.
    pub fn default_group(&self) -> &str {
        self.group_id.as_deref().unwrap_or(DEFAULT_GROUP_ID)
    }
}
