//! Ingestion endpoints: caller-described batches and free-text episodes

use asset_graph::nodes::EpisodeType;
use asset_graph::pipeline::{add_episode, build_episode_graph, EdgeInput, EpisodeRequest, NodeInput};
use asset_graph::{GraphError, KnowledgeGraph};
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use super::success;
use crate::error::ApiError;
use crate::state::AppState;

pub fn graph_routes<G: KnowledgeGraph + 'static>(state: AppState<G>) -> Router {
    Router::new()
        .route("/build-graph", post(build_graph_handler::<G>))
        .route("/add-episode", post(add_episode_handler::<G>))
        .with_state(state)
}

/// `label` may be a single string or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LabelSet {
    One(String),
    Many(Vec<String>),
}

impl LabelSet {
    fn into_vec(self) -> Vec<String> {
        match self {
            LabelSet::One(label) => vec![label],
            LabelSet::Many(labels) => labels,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NodeBody {
    pub id: String,
    #[serde(default, alias = "labels")]
    pub label: Option<LabelSet>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl From<NodeBody> for NodeInput {
    fn from(body: NodeBody) -> Self {
        NodeInput {
            id: body.id,
            labels: body.label.map(LabelSet::into_vec).unwrap_or_default(),
            properties: body.properties,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EdgeBody {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl From<EdgeBody> for EdgeInput {
    fn from(body: EdgeBody) -> Self {
        EdgeInput {
            source: body.source,
            target: body.target,
            relation_type: body.relation_type,
            properties: body.properties.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BuildGraphBody {
    pub episode_name: String,
    /// Defaults to `document`.
    #[serde(default)]
    pub episode_type: Option<String>,
    pub source_description: String,
    #[serde(default)]
    pub reference_time: Option<String>,
    /// Episode text; a summary of the batch is stored when absent.
    #[serde(default)]
    pub episode_body: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeBody>,
    #[serde(default)]
    pub edges: Vec<EdgeBody>,
}

#[derive(Debug, Deserialize)]
pub struct AddEpisodeBody {
    pub name: String,
    #[serde(alias = "body", alias = "content")]
    pub episode_body: String,
    #[serde(default)]
    pub source_description: String,
    #[serde(default)]
    pub reference_time: Option<String>,
    #[serde(default)]
    pub episode_type: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

fn parse_episode_type(raw: Option<&str>) -> Result<EpisodeType, ApiError> {
    match raw.map(str::parse::<EpisodeType>).transpose() {
        Ok(source) => Ok(source.unwrap_or_default()),
        Err(GraphError::Validation(msg)) => Err(ApiError::Invalid(msg)),
        Err(other) => Err(ApiError::Invalid(other.to_string())),
    }
}

fn batch_summary(nodes: usize, edges: usize) -> String {
    format!("Manufacturing document with {nodes} entities and {edges} relationships")
}

async fn build_graph_handler<G: KnowledgeGraph>(
    State(state): State<AppState<G>>,
    Json(body): Json<BuildGraphBody>,
) -> Result<Json<Value>, ApiError> {
    let graph = state.graph()?;
    let source = parse_episode_type(body.episode_type.as_deref())?;

    info!(
        episode = %body.episode_name,
        nodes = body.nodes.len(),
        edges = body.edges.len(),
        "build-graph request"
    );

    let episode = EpisodeRequest {
        body: body
            .episode_body
            .unwrap_or_else(|| batch_summary(body.nodes.len(), body.edges.len())),
        name: body.episode_name,
        source_description: body.source_description,
        reference_time: body.reference_time,
        source,
        group_id: body.group_id,
    };
    let nodes = body.nodes.into_iter().map(NodeInput::from).collect();
    let edges = body.edges.into_iter().map(EdgeInput::from).collect();

    let report = build_episode_graph(graph, episode, nodes, edges).await?;
    success(report)
}

async fn add_episode_handler<G: KnowledgeGraph>(
    State(state): State<AppState<G>>,
    Json(body): Json<AddEpisodeBody>,
) -> Result<Json<Value>, ApiError> {
    let graph = state.graph()?;
    let source = parse_episode_type(body.episode_type.as_deref())?;

    info!(episode = %body.name, chars = body.episode_body.len(), "add-episode request");

    let request = EpisodeRequest {
        name: body.name,
        body: body.episode_body,
        source_description: body.source_description,
        reference_time: body.reference_time,
        source,
        group_id: body.group_id,
    };
    let result = add_episode(graph, request).await?;
    success(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn label_accepts_string_or_list() {
        let single: NodeBody =
            serde_json::from_value(json!({"id": "T1", "label": "Tool"})).unwrap();
        assert_eq!(NodeInput::from(single).labels, vec!["Tool"]);

        let many: NodeBody =
            serde_json::from_value(json!({"id": "T1", "labels": ["Tool", "Asset"]})).unwrap();
        assert_eq!(NodeInput::from(many).labels, vec!["Tool", "Asset"]);

        let none: NodeBody = serde_json::from_value(json!({"id": "T1"})).unwrap();
        assert!(NodeInput::from(none).labels.is_empty());
    }

    #[test]
    fn edge_properties_are_optional() {
        let edge: EdgeBody =
            serde_json::from_value(json!({"source": "A", "target": "B", "type": "USES"})).unwrap();
        let input = EdgeInput::from(edge);
        assert_eq!(input.relation_type, "USES");
        assert!(input.properties.is_empty());
    }

    #[test]
    fn episode_type_defaults_and_rejects_unknown() {
        assert_eq!(parse_episode_type(None).unwrap(), EpisodeType::Text);
        assert_eq!(parse_episode_type(Some("document")).unwrap(), EpisodeType::Text);
        assert_eq!(parse_episode_type(Some("json")).unwrap(), EpisodeType::Json);
        assert!(matches!(parse_episode_type(Some("pdf")), Err(ApiError::Invalid(_))));
    }

    #[test]
    fn episode_body_aliases() {
        let body: AddEpisodeBody =
            serde_json::from_value(json!({"name": "n", "content": "text"})).unwrap();
        assert_eq!(body.episode_body, "text");
        assert_eq!(body.source_description, "");
    }
}
