mod graph;
mod health;
mod search;

pub use graph::{graph_routes, AddEpisodeBody, BuildGraphBody, EdgeBody, LabelSet, NodeBody};
pub use health::{health_routes, SERVICE_NAME};
pub use search::{search_routes, SearchBody};

use asset_graph::KnowledgeGraph;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// All routes, sharing one state.
pub fn router<G: KnowledgeGraph + 'static>(state: AppState<G>) -> Router {
    Router::new()
        .merge(health_routes(state.clone()))
        .merge(graph_routes(state.clone()))
        .merge(search_routes(state))
}

/// Wrap a report object as `{"status": "success", ...report, "timestamp"}`.
pub(crate) fn success<T: Serialize>(report: T) -> Result<Json<Value>, ApiError> {
    let mut body = match serde_json::to_value(report) {
        Ok(Value::Object(map)) => map,
        Ok(other) => return Err(ApiError::Internal(format!("unexpected report shape: {other}"))),
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };
    body.insert("status".to_string(), Value::from("success"));
    body.insert("timestamp".to_string(), Value::from(Utc::now().to_rfc3339()));
    Ok(Json(Value::Object(body)))
}
