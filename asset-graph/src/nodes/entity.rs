//! EntityNode: a persisted manufacturing entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label every entity carries in addition to its caller-supplied labels.
pub const ENTITY_LABEL: &str = "Entity";

/// A manufacturing entity (tool, part, project, asset) stored in the graph.
///
/// `uuid` is the internal identifier; it is minted when the node is created and
/// is the only identifier valid across requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub uuid: Uuid,
    pub name: String,
    pub group_id: String,
    pub labels: Vec<String>,
    pub summary: String,
    pub name_embedding: Option<Vec<f32>>,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl EntityNode {
    /// Create a fresh node with a newly minted UUID.
    ///
    /// `labels` is normalized: blanks are dropped, duplicates removed (first
    /// occurrence wins) and [`ENTITY_LABEL`] is appended when missing.
    pub fn new(
        name: impl Into<String>,
        group_id: impl Into<String>,
        labels: impl IntoIterator<Item = String>,
        attributes: serde_json::Value,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            group_id: group_id.into(),
            labels: normalize_labels(labels),
            summary: String::new(),
            name_embedding: None,
            attributes,
            created_at: Utc::now(),
        }
    }

    /// Labels other than the base [`ENTITY_LABEL`].
    pub fn domain_labels(&self) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .map(String::as_str)
            .filter(|l| *l != ENTITY_LABEL)
    }
}

fn normalize_labels(labels: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        let label = label.trim();
        if label.is_empty() || out.iter().any(|l| l == label) {
            continue;
        }
        out.push(label.to_string());
    }
    if !out.iter().any(|l| l == ENTITY_LABEL) {
        out.push(ENTITY_LABEL.to_string());
    }
    out
}
