//! EntityEdge: bi-temporal factual relationship between EntityNodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A factual relationship between two entity nodes, with bi-temporal metadata.
///
/// - **Valid time** (`valid_at` / `invalid_at`): when the fact was true in the real world.
/// - **Transaction time** (`created_at` / `expired_at`): when the edge exists in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEdge {
    /// Unique identifier for this edge.
    pub uuid: Uuid,
    /// UUID of the source EntityNode.
    pub source_node_uuid: Uuid,
    /// UUID of the target EntityNode.
    pub target_node_uuid: Uuid,
    /// Relationship type (e.g. "USES", "COMPATIBLE_WITH").
    pub name: String,
    /// Human-readable fact string.
    pub fact: String,
    /// Optional embedding vector for the fact.
    pub fact_embedding: Option<Vec<f32>>,
    /// Episodes that asserted this fact.
    pub episodes: Vec<Uuid>,
    /// When the fact became true in the real world (valid-time start).
    pub valid_at: Option<DateTime<Utc>>,
    /// When the fact ceased to be true in the real world (valid-time end).
    pub invalid_at: Option<DateTime<Utc>>,
    /// When this edge was created in the graph (transaction-time start).
    pub created_at: DateTime<Utc>,
    /// When this edge was superseded in the graph (transaction-time end).
    pub expired_at: Option<DateTime<Utc>>,
    /// Arbitrary JSON attributes.
    pub attributes: serde_json::Value,
    /// Group / partition identifier.
    pub group_id: String,
}

impl EntityEdge {
    /// Create a fresh edge with a newly minted UUID and an open validity interval.
    pub fn new(
        source_node_uuid: Uuid,
        target_node_uuid: Uuid,
        name: impl Into<String>,
        fact: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            source_node_uuid,
            target_node_uuid,
            name: name.into(),
            fact: fact.into(),
            fact_embedding: None,
            episodes: Vec::new(),
            valid_at: None,
            invalid_at: None,
            created_at: Utc::now(),
            expired_at: None,
            attributes: serde_json::Value::Object(Default::default()),
            group_id: group_id.into(),
        }
    }
}
