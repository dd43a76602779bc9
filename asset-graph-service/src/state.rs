use std::sync::Arc;

use asset_graph::{GraphConfig, KnowledgeGraph};

use crate::error::ApiError;

const NOT_SET: &str = "Not set";

/// Configuration echoed by `/health`.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub neo4j_uri: String,
    pub model_name: String,
    pub small_model_name: String,
    pub embedding_model: String,
}

impl ServiceInfo {
    pub fn from_config(config: Option<&GraphConfig>) -> Self {
        match config {
            Some(c) => Self {
                neo4j_uri: c.neo4j_uri.clone(),
                model_name: c.model_name.clone(),
                small_model_name: c.small_model_name.clone(),
                embedding_model: c.embedding_model.clone(),
            },
            None => Self {
                neo4j_uri: NOT_SET.to_string(),
                model_name: NOT_SET.to_string(),
                small_model_name: NOT_SET.to_string(),
                embedding_model: NOT_SET.to_string(),
            },
        }
    }
}

/// Shared handler state. `graph` is `None` when initialization failed.
pub struct AppState<G> {
    pub graph: Option<Arc<G>>,
    pub info: Arc<ServiceInfo>,
}

impl<G> Clone for AppState<G> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            info: self.info.clone(),
        }
    }
}

impl<G: KnowledgeGraph> AppState<G> {
    pub fn new(graph: Option<Arc<G>>, info: ServiceInfo) -> Self {
        Self {
            graph,
            info: Arc::new(info),
        }
    }

    /// The graph client, or [`ApiError::NotInitialized`].
    pub fn graph(&self) -> Result<&G, ApiError> {
        self.graph.as_deref().ok_or(ApiError::NotInitialized)
    }
}
