//! Search facade.
//!
//! A natural-language query goes to the store's hybrid search (full-text plus
//! embedding similarity, fused with reciprocal-rank fusion, optionally reranked
//! around a center node). The store answers with [`SearchHit`]s, whose optional
//! fields mark attributes the store did not provide; [`SearchResult`] is the
//! stable outward shape, where every such attribute is an explicit `null`.
//!
//! The facade imposes no ordering of its own and has no degraded mode: a
//! failing store search fails the request.

pub mod rank;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::embedder::Embedding;
use crate::errors::Result;
use crate::graph::KnowledgeGraph;

/// Result cap applied when a request names none.
pub const DEFAULT_LIMIT: usize = 10;

/// Hard upper bound on results per search.
pub const MAX_LIMIT: usize = 100;

/// A search as issued to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub limit: usize,
    /// Anchor node; passed through verbatim, existence is not checked.
    pub center_node_uuid: Option<String>,
    pub group_id: String,
    /// Query embedding, filled in by the graph before it reaches a driver.
    pub embedding: Option<Embedding>,
}

/// A caller's search request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
    /// Alias for `limit`; wins when both are set.
    pub num_results: Option<usize>,
    pub center_node_uuid: Option<String>,
    pub group_id: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Result cap: `num_results`, else `limit`, else [`DEFAULT_LIMIT`], at most [`MAX_LIMIT`].
    pub fn effective_limit(&self) -> usize {
        self.num_results
            .or(self.limit)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }
}

// ── Store-side hits ───────────────────────────────────────────────────────────

/// One store result. Optional fields are `None` when the store did not provide them.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchHit {
    Node(NodeHit),
    Edge(EdgeHit),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeHit {
    pub uuid: Uuid,
    pub name: Option<String>,
    pub labels: Option<Vec<String>>,
    pub summary: Option<String>,
    /// Caller-supplied properties stored with the entity.
    pub attributes: Option<Value>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeHit {
    pub uuid: Uuid,
    pub source_node_uuid: Option<Uuid>,
    pub target_node_uuid: Option<Uuid>,
    pub name: Option<String>,
    pub fact: Option<String>,
    pub valid_at: Option<DateTime<Utc>>,
    pub invalid_at: Option<DateTime<Utc>>,
    pub score: Option<f64>,
}

impl SearchHit {
    pub fn uuid(&self) -> Uuid {
        match self {
            SearchHit::Node(n) => n.uuid,
            SearchHit::Edge(e) => e.uuid,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            SearchHit::Node(n) => n.score,
            SearchHit::Edge(e) => e.score,
        }
    }

    pub(crate) fn set_score(&mut self, score: f64) {
        match self {
            SearchHit::Node(n) => n.score = Some(score),
            SearchHit::Edge(e) => e.score = Some(score),
        }
    }
}

// ── Normalized results ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Node,
    Edge,
}

/// Stable outward shape of one search result. `None` serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub uuid: String,
    pub kind: ResultKind,
    pub name: Option<String>,
    pub labels: Option<Vec<String>>,
    pub summary: Option<String>,
    /// Stored entity properties; `null` for relationship results.
    pub properties: Option<Value>,
    pub fact: Option<String>,
    pub valid_at: Option<DateTime<Utc>>,
    pub invalid_at: Option<DateTime<Utc>>,
    pub relevance_score: Option<f64>,
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        match hit {
            SearchHit::Node(n) => SearchResult {
                uuid: n.uuid.to_string(),
                kind: ResultKind::Node,
                name: n.name,
                labels: n.labels,
                summary: n.summary,
                properties: n.attributes,
                fact: None,
                valid_at: None,
                invalid_at: None,
                relevance_score: n.score,
            },
            SearchHit::Edge(e) => SearchResult {
                uuid: e.uuid.to_string(),
                kind: ResultKind::Edge,
                name: e.name,
                labels: None,
                summary: None,
                properties: None,
                fact: e.fact,
                valid_at: e.valid_at,
                invalid_at: e.invalid_at,
                relevance_score: e.score,
            },
        }
    }
}

/// Run `request` against the store and normalize the hits, in store order.
pub async fn search<G: KnowledgeGraph>(
    graph: &G,
    request: SearchRequest,
) -> Result<Vec<SearchResult>> {
    let query = SearchQuery {
        limit: request.effective_limit(),
        group_id: request
            .group_id
            .clone()
            .unwrap_or_else(|| graph.default_group().to_string()),
        center_node_uuid: request.center_node_uuid.clone(),
        text: request.query,
        embedding: None,
    };
    info!(query = %query.text, limit = query.limit, center = ?query.center_node_uuid, "searching graph");

    let hits = graph.search(query).await?;
    let results: Vec<SearchResult> = hits.into_iter().map(SearchResult::from).collect();

    info!(count = results.len(), "search complete");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_results_takes_precedence_over_limit() {
        let req = SearchRequest {
            limit: Some(10),
            num_results: Some(3),
            ..SearchRequest::new("drill")
        };
        assert_eq!(req.effective_limit(), 3);
    }

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(SearchRequest::new("q").effective_limit(), DEFAULT_LIMIT);
        let req = SearchRequest {
            limit: Some(5_000),
            ..SearchRequest::new("q")
        };
        assert_eq!(req.effective_limit(), MAX_LIMIT);
    }

    #[test]
    fn node_hit_normalizes_with_explicit_nulls() {
        let uuid = Uuid::new_v4();
        let result = SearchResult::from(SearchHit::Node(NodeHit {
            uuid,
            name: Some("Drill".to_string()),
            labels: Some(vec!["Tool".to_string(), "Entity".to_string()]),
            summary: None,
            attributes: None,
            score: None,
        }));

        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["uuid"], uuid.to_string());
        assert_eq!(json["kind"], "node");
        assert_eq!(json["name"], "Drill");
        let obj = json.as_object().expect("object");
        for key in ["relevance_score", "fact", "valid_at", "invalid_at", "summary", "properties"] {
            assert!(obj.contains_key(key), "{key} must be present");
            assert!(obj[key].is_null(), "{key} must be null");
        }
    }

    #[test]
    fn edge_hit_normalizes_fact_and_interval() {
        let valid = DateTime::parse_from_rfc3339("2023-04-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let result = SearchResult::from(SearchHit::Edge(EdgeHit {
            uuid: Uuid::new_v4(),
            source_node_uuid: None,
            target_node_uuid: None,
            name: Some("USES".to_string()),
            fact: Some("Project Falcon uses Drill T1".to_string()),
            valid_at: Some(valid),
            invalid_at: None,
            score: Some(0.42),
        }));

        assert_eq!(result.kind, ResultKind::Edge);
        assert_eq!(result.fact.as_deref(), Some("Project Falcon uses Drill T1"));
        assert_eq!(result.valid_at, Some(valid));
        assert!(result.labels.is_none());
        assert_eq!(result.relevance_score, Some(0.42));

        let json = serde_json::to_value(&result).expect("serialize");
        assert!(json["labels"].is_null());
        assert!(json["properties"].is_null());
        assert!(json["invalid_at"].is_null());
    }

    #[test]
    fn node_attributes_surface_as_properties() {
        let result = SearchResult::from(SearchHit::Node(NodeHit {
            uuid: Uuid::new_v4(),
            name: Some("Cordless Drill".to_string()),
            labels: None,
            summary: None,
            attributes: Some(serde_json::json!({"serial": "X9", "torque_nm": 60})),
            score: Some(0.1),
        }));

        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["properties"]["serial"], "X9");
        assert_eq!(json["properties"]["torque_nm"], 60);
    }
}
