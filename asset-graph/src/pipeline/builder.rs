//! Batch Graph Builder.
//!
//! Writes caller-described nodes and edges under an open episode. Nodes go
//! first, one at a time and in input order, each successful create recording
//! `external id -> internal uuid` in a map that lives for this call only.
//! Edges follow, resolving both endpoints through that map; an endpoint that
//! is not in it (never declared, or its creation failed) fails the edge with
//! `node not found: <id>` and no store call is made.
//!
//! Item failures are data in the [`BuildReport`]. Only opening the episode can
//! fail the whole request.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::Result;
use crate::extraction::DEFAULT_RELATION_TYPE;
use crate::graph::{EntityDraft, KnowledgeGraph, RelationDraft};
use crate::nodes::EpisodicNode;
use crate::utils::parse_flexible_datetime;

use super::episode::{open_episode, EpisodeRequest};

/// A caller-described node, identified by a request-local external id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInput {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: Map<String, Value>,
}

/// A caller-described edge between two external ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeInput {
    pub source: String,
    pub target: String,
    pub relation_type: String,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Created,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutcome {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeOutcome {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<Uuid>,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-item accounting for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub episode_id: Uuid,
    pub episode_name: String,
    pub reference_time: DateTime<Utc>,
    pub nodes_requested: usize,
    pub nodes_created: usize,
    pub nodes_failed: usize,
    pub edges_requested: usize,
    pub edges_created: usize,
    pub edges_failed: usize,
    pub node_results: Vec<NodeOutcome>,
    pub edge_results: Vec<EdgeOutcome>,
    pub warnings: Vec<String>,
}

/// A node created in this request.
#[derive(Debug, Clone)]
struct Resolved {
    uuid: Uuid,
    name: String,
}

/// Display name: the `name` property, or the external id when there is none.
pub fn display_name(node: &NodeInput) -> String {
    match node.properties.get("name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        None | Some(Value::Null) | Some(Value::String(_)) => node.id.clone(),
        Some(other) => other.to_string(),
    }
}

fn string_property<'a>(props: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| props.get(*k)?.as_str().filter(|s| !s.trim().is_empty()))
}

fn timestamp_property(props: &Map<String, Value>, keys: &[&str]) -> Option<DateTime<Utc>> {
    string_property(props, keys).and_then(parse_flexible_datetime)
}

/// Open an episode for `request`, then build `nodes` and `edges` under it.
pub async fn build_episode_graph<G: KnowledgeGraph>(
    graph: &G,
    request: EpisodeRequest,
    nodes: Vec<NodeInput>,
    edges: Vec<EdgeInput>,
) -> Result<BuildReport> {
    let opened = open_episode(graph, request).await?;
    let mut report = build_graph(graph, &opened.episode, nodes, edges).await;
    let mut warnings = opened.warnings;
    warnings.append(&mut report.warnings);
    report.warnings = warnings;
    Ok(report)
}

/// Create `nodes` then `edges` under `episode`, sequentially and in input order.
pub async fn build_graph<G: KnowledgeGraph>(
    graph: &G,
    episode: &EpisodicNode,
    nodes: Vec<NodeInput>,
    edges: Vec<EdgeInput>,
) -> BuildReport {
    let nodes_requested = nodes.len();
    let edges_requested = edges.len();

    let mut id_map: HashMap<String, Resolved> = HashMap::with_capacity(nodes_requested);
    let mut node_results = Vec::with_capacity(nodes_requested);
    for node in nodes {
        let outcome = create_node(graph, episode, node, &mut id_map).await;
        node_results.push(outcome);
    }

    let mut edge_results = Vec::with_capacity(edges_requested);
    for edge in edges {
        edge_results.push(create_edge(graph, episode, edge, &id_map).await);
    }

    let nodes_created = count(&node_results, |o| o.status);
    let edges_created = count(&edge_results, |o| o.status);
    let report = BuildReport {
        episode_id: episode.uuid,
        episode_name: episode.name.clone(),
        reference_time: episode.valid_at,
        nodes_requested,
        nodes_created,
        nodes_failed: nodes_requested - nodes_created,
        edges_requested,
        edges_created,
        edges_failed: edges_requested - edges_created,
        node_results,
        edge_results,
        warnings: Vec::new(),
    };
    info!(
        episode = %episode.uuid,
        nodes_created = report.nodes_created,
        nodes_failed = report.nodes_failed,
        edges_created = report.edges_created,
        edges_failed = report.edges_failed,
        "graph batch built"
    );
    report
}

fn count<T>(items: &[T], status: impl Fn(&T) -> ItemStatus) -> usize {
    items.iter().filter(|i| status(*i) == ItemStatus::Created).count()
}

async fn create_node<G: KnowledgeGraph>(
    graph: &G,
    episode: &EpisodicNode,
    node: NodeInput,
    id_map: &mut HashMap<String, Resolved>,
) -> NodeOutcome {
    let name = display_name(&node);
    let draft = EntityDraft {
        name: name.clone(),
        labels: node.labels,
        summary: string_property(&node.properties, &["summary", "description"])
            .unwrap_or_default()
            .to_string(),
        attributes: Value::Object(node.properties),
    };

    match graph.add_entity(episode, draft).await {
        Ok(created) => {
            debug!(external_id = %node.id, node = %created.uuid, "node created");
            id_map.insert(
                node.id.clone(),
                Resolved {
                    uuid: created.uuid,
                    name: name.clone(),
                },
            );
            NodeOutcome {
                id: node.id,
                graph_id: Some(created.uuid),
                name: Some(name),
                status: ItemStatus::Created,
                error: None,
            }
        }
        Err(e) => {
            warn!(external_id = %node.id, error = %e, "node creation failed");
            NodeOutcome {
                id: node.id,
                graph_id: None,
                name: Some(name),
                status: ItemStatus::Failed,
                error: Some(e.to_string()),
            }
        }
    }
}

async fn create_edge<G: KnowledgeGraph>(
    graph: &G,
    episode: &EpisodicNode,
    edge: EdgeInput,
    id_map: &HashMap<String, Resolved>,
) -> EdgeOutcome {
    let failed = |edge: EdgeInput, reason: String| EdgeOutcome {
        source: edge.source,
        target: edge.target,
        relation_type: edge.relation_type,
        graph_id: None,
        status: ItemStatus::Failed,
        error: Some(reason),
    };

    let (source, target) = match (id_map.get(&edge.source), id_map.get(&edge.target)) {
        (Some(s), Some(t)) => (s, t),
        (s, _) => {
            let missing = if s.is_none() { &edge.source } else { &edge.target };
            let reason = format!("node not found: {missing}");
            warn!(source = %edge.source, target = %edge.target, "{reason}");
            return failed(edge, reason);
        }
    };

    let relation_type = match edge.relation_type.trim() {
        "" => DEFAULT_RELATION_TYPE.to_string(),
        t => t.to_string(),
    };
    let fact = string_property(&edge.properties, &["fact", "description"])
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} {} {}", source.name, relation_type, target.name));
    let draft = RelationDraft {
        source: source.uuid,
        target: target.uuid,
        relation_type,
        fact,
        valid_at: timestamp_property(&edge.properties, &["valid_at", "valid_from"]),
        invalid_at: timestamp_property(&edge.properties, &["invalid_at", "valid_to"]),
        attributes: Value::Object(edge.properties.clone()),
    };

    match graph.add_relation(episode, draft).await {
        Ok(created) => {
            debug!(source = %edge.source, target = %edge.target, edge = %created.uuid, "edge created");
            EdgeOutcome {
                source: edge.source,
                target: edge.target,
                relation_type: edge.relation_type,
                graph_id: Some(created.uuid),
                status: ItemStatus::Created,
                error: None,
            }
        }
        Err(e) => {
            warn!(source = %edge.source, target = %edge.target, error = %e, "edge creation failed");
            failed(edge, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str, props: Value) -> NodeInput {
        NodeInput {
            id: id.to_string(),
            labels: vec!["Tool".to_string()],
            properties: props.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn display_name_prefers_name_property() {
        assert_eq!(display_name(&node("T1", json!({"name": "Drill"}))), "Drill");
        assert_eq!(display_name(&node("T1", json!({"serial": "X9"}))), "T1");
        assert_eq!(display_name(&node("T1", json!({"name": null}))), "T1");
        assert_eq!(display_name(&node("T1", json!({"name": "  "}))), "T1");
        assert_eq!(display_name(&node("T1", json!({"name": 42}))), "42");
    }

    #[test]
    fn outcomes_serialize_without_absent_fields() {
        let outcome = NodeOutcome {
            id: "P1".to_string(),
            graph_id: None,
            name: Some("P1".to_string()),
            status: ItemStatus::Failed,
            error: Some("boom".to_string()),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, json!({"id": "P1", "name": "P1", "status": "failed", "error": "boom"}));

        let edge = EdgeOutcome {
            source: "T1".to_string(),
            target: "P1".to_string(),
            relation_type: "USES".to_string(),
            graph_id: None,
            status: ItemStatus::Failed,
            error: Some("node not found: P1".to_string()),
        };
        assert_eq!(serde_json::to_value(&edge).unwrap()["type"], "USES");
    }

    #[test]
    fn string_property_skips_blank_and_non_strings() {
        let props = json!({"fact": "  ", "description": "Falcon uses the drill", "valid_at": 7});
        let props = props.as_object().unwrap();
        assert_eq!(string_property(props, &["fact"]), None);
        assert_eq!(string_property(props, &["fact", "description"]), Some("Falcon uses the drill"));
        assert_eq!(string_property(props, &["description"]), Some("Falcon uses the drill"));
        assert_eq!(timestamp_property(props, &["valid_at"]), None);
    }
}
