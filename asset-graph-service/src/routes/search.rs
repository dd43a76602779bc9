//! Search endpoint

use asset_graph::search::{search, SearchRequest};
use asset_graph::KnowledgeGraph;
use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

pub fn search_routes<G: KnowledgeGraph + 'static>(state: AppState<G>) -> Router {
    Router::new()
        .route("/search-graph", post(search_handler::<G>))
        .with_state(state)
}

fn default_limit() -> usize {
    10
}

/// Unknown fields (e.g. `filters`) are accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Takes precedence over `limit`.
    #[serde(default)]
    pub num_results: Option<usize>,
    #[serde(default)]
    pub center_node_uuid: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

async fn search_handler<G: KnowledgeGraph>(
    State(state): State<AppState<G>>,
    Json(body): Json<SearchBody>,
) -> Result<Json<Value>, ApiError> {
    let graph = state.graph()?;

    let request = SearchRequest {
        query: body.query.clone(),
        limit: Some(body.limit),
        num_results: body.num_results,
        center_node_uuid: body.center_node_uuid,
        group_id: body.group_id,
    };
    let limit = request.effective_limit();
    let results = search(graph, request).await?;

    info!(query = %body.query, limit, count = results.len(), "search-graph request");

    Ok(Json(json!({
        "status": "success",
        "query": body.query,
        "count": results.len(),
        "results": results,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}
