//! EpisodicEdge: MENTIONS relationship (EpisodicNode → EntityNode).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An edge representing a MENTIONS relationship from an episodic node to an entity node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicEdge {
    /// Unique identifier for this edge.
    pub uuid: Uuid,
    /// UUID of the source EpisodicNode.
    pub source_node_uuid: Uuid,
    /// UUID of the target EntityNode.
    pub target_node_uuid: Uuid,
    /// Group / partition identifier.
    pub group_id: String,
    /// When this edge was created in the graph.
    pub created_at: DateTime<Utc>,
}

impl EpisodicEdge {
    pub fn mentions(episode_uuid: Uuid, entity_uuid: Uuid, group_id: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            source_node_uuid: episode_uuid,
            target_node_uuid: entity_uuid,
            group_id: group_id.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_links_episode_to_entity() {
        let episode = Uuid::new_v4();
        let entity = Uuid::new_v4();
        let edge = EpisodicEdge::mentions(episode, entity, "plant-1");
        assert_eq!(edge.source_node_uuid, episode);
        assert_eq!(edge.target_node_uuid, entity);
        assert_eq!(edge.group_id, "plant-1");
    }

    #[test]
    fn episodic_edge_deserializes_from_json() {
        let uuid = Uuid::new_v4();
        let source = Uuid::new_v4();
        let target = Uuid::new_v4();
        let json = format!(
            r#"{{
                "uuid": "{uuid}",
                "source_node_uuid": "{source}",
                "target_node_uuid": "{target}",
                "group_id": "g",
                "created_at": "2026-01-01T00:00:00Z"
            }}"#
        );
        let edge: EpisodicEdge = serde_json::from_str(&json).unwrap();
        assert_eq!(edge.uuid, uuid);
        assert_eq!(edge.source_node_uuid, source);
        assert_eq!(edge.target_node_uuid, target);
    }
}
