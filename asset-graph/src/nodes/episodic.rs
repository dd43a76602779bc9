//! EpisodicNode: one ingestion unit.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::GraphError;

/// The source type of an episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeType {
    Message,
    Json,
    #[default]
    Text,
}

impl EpisodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            EpisodeType::Message => "message",
            EpisodeType::Json => "json",
            EpisodeType::Text => "text",
        }
    }
}

impl fmt::Display for EpisodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EpisodeType {
    type Err = GraphError;

    /// Accepts the three canonical names plus `document`, which batch uploads
    /// use for what is stored as plain text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "message" => Ok(EpisodeType::Message),
            "json" => Ok(EpisodeType::Json),
            "text" | "document" => Ok(EpisodeType::Text),
            other => Err(GraphError::Validation(format!(
                "unknown episode type '{other}'"
            ))),
        }
    }
}

/// A stored episode. Created once per ingestion request and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicNode {
    pub uuid: Uuid,
    pub name: String,
    pub group_id: String,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub source: EpisodeType,
    pub source_description: String,
    pub content: String,
    /// Reference time: when the episode's content was true in the world.
    pub valid_at: DateTime<Utc>,
    /// UUIDs of the fact edges written under this episode.
    pub entity_edges: Vec<Uuid>,
}
