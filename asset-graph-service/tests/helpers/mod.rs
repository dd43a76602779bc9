#![allow(dead_code)]

use std::sync::Arc;

use asset_graph::driver::memory::InMemoryDriver;
use asset_graph::driver::GraphDriver;
use asset_graph::edges::{EntityEdge, EpisodicEdge};
use asset_graph::embedder::hashed::HashedEmbedder;
use asset_graph::errors::{GraphError, Result};
use asset_graph::llm_client::{LlmClient, Message};
use asset_graph::nodes::{EntityNode, EpisodicNode};
use asset_graph::search::{SearchHit, SearchQuery};
use asset_graph::AssetGraph;
use asset_graph_service::{router, AppState, ServiceInfo};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

/// LLM that always answers with the same text.
pub struct ScriptedLlm(pub String);

impl LlmClient for ScriptedLlm {
    async fn generate(&self, _messages: &[Message]) -> Result<String> {
        Ok(self.0.clone())
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub type TestGraph = AssetGraph<InMemoryDriver, ScriptedLlm, HashedEmbedder>;

pub fn info() -> ServiceInfo {
    ServiceInfo {
        neo4j_uri: "bolt://graph.test:7687".to_string(),
        model_name: "scripted".to_string(),
        small_model_name: "scripted-small".to_string(),
        embedding_model: "hashed".to_string(),
    }
}

/// Router over an in-memory graph whose extraction model replies with `reply`.
pub fn app_with_reply(reply: &str) -> (Router, Arc<TestGraph>) {
    let graph = Arc::new(AssetGraph::new(
        InMemoryDriver::new(),
        ScriptedLlm(reply.to_string()),
        HashedEmbedder::new(64),
    ));
    let app = router(AppState::new(Some(graph.clone()), info()));
    (app, graph)
}

pub fn app() -> (Router, Arc<TestGraph>) {
    app_with_reply("{}")
}

/// Store that is reachable but rejects episode writes.
#[derive(Default)]
pub struct EpisodeRejectingDriver {
    inner: InMemoryDriver,
}

impl GraphDriver for EpisodeRejectingDriver {
    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    async fn build_indices(&self) -> Result<()> {
        self.inner.build_indices().await
    }

    async fn save_episode(&self, _episode: &EpisodicNode) -> Result<()> {
        Err(GraphError::Driver("connection refused".to_string()))
    }

    async fn save_entity_node(&self, node: &EntityNode) -> Result<()> {
        self.inner.save_entity_node(node).await
    }

    async fn save_entity_edge(&self, edge: &EntityEdge) -> Result<()> {
        self.inner.save_entity_edge(edge).await
    }

    async fn save_episodic_edge(&self, edge: &EpisodicEdge) -> Result<()> {
        self.inner.save_episodic_edge(edge).await
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        self.inner.search(query).await
    }
}

/// Router whose store refuses to open episodes.
pub fn episode_rejecting_app() -> Router {
    let graph = AssetGraph::new(
        EpisodeRejectingDriver::default(),
        ScriptedLlm("{}".to_string()),
        HashedEmbedder::new(64),
    );
    router(AppState::new(Some(Arc::new(graph)), info()))
}

/// Router whose graph never initialized.
pub fn uninitialized_app() -> Router {
    router(AppState::<TestGraph>::new(None, ServiceInfo::from_config(None)))
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
