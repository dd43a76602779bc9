//! Liveness and banner endpoints

use asset_graph::KnowledgeGraph;
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

pub const SERVICE_NAME: &str = "Manufacturing Asset Graph Service";

const ENDPOINTS: &[&str] = &[
    "/health",
    "/build-graph",
    "/add-episode",
    "/search-graph",
    "/stats",
];

pub fn health_routes<G: KnowledgeGraph + 'static>(state: AppState<G>) -> Router {
    Router::new()
        .route("/", get(root::<G>))
        .route("/health", get(health_check::<G>))
        .route("/stats", get(stats))
        .with_state(state)
}

fn status_label(healthy: bool) -> &'static str {
    if healthy {
        "healthy"
    } else {
        "unhealthy"
    }
}

async fn root<G: KnowledgeGraph>(State(state): State<AppState<G>>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "status": status_label(state.graph.is_some()),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ENDPOINTS,
    }))
}

async fn health_check<G: KnowledgeGraph>(State(state): State<AppState<G>>) -> Json<Value> {
    let connected = match state.graph() {
        Ok(graph) => match graph.health().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "graph store ping failed");
                false
            }
        },
        Err(_) => false,
    };

    Json(json!({
        "status": status_label(connected),
        "graph_connected": connected,
        "neo4j_uri": state.info.neo4j_uri,
        "model_name": state.info.model_name,
        "small_model_name": state.info.small_model_name,
        "embedding_model": state.info.embedding_model,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// Not part of the contract yet; callers get a stable placeholder.
async fn stats() -> Json<Value> {
    Json(json!({
        "status": "not_implemented",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
