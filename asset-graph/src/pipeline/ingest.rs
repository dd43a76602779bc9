//! Text-Episode Ingestion.
//!
//! Extraction is entirely the graph's business; this layer only resolves the
//! timestamp and reads back whatever the extraction reported. Missing counts
//! read as zero and a missing episode id as [`EPISODE_ID_PLACEHOLDER`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::errors::Result;
use crate::graph::{ExtractionOutcome, KnowledgeGraph};

use super::episode::EpisodeRequest;

/// Reported when the extraction did not say which episode it created.
pub const EPISODE_ID_PLACEHOLDER: &str = "created";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeIngestResult {
    pub episode_id: String,
    pub episode_name: String,
    pub reference_time: DateTime<Utc>,
    pub entities_extracted: usize,
    pub relations_extracted: usize,
    pub warnings: Vec<String>,
}

impl EpisodeIngestResult {
    fn from_outcome(
        outcome: ExtractionOutcome,
        episode_name: String,
        reference_time: DateTime<Utc>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            episode_id: outcome
                .episode_uuid
                .map(|u| u.to_string())
                .unwrap_or_else(|| EPISODE_ID_PLACEHOLDER.to_string()),
            episode_name,
            reference_time,
            entities_extracted: outcome.entity_count.unwrap_or(0),
            relations_extracted: outcome.relation_count.unwrap_or(0),
            warnings,
        }
    }
}

/// Ingest free text as an episode, letting the extraction model build the graph.
pub async fn add_episode<G: KnowledgeGraph>(graph: &G, request: EpisodeRequest) -> Result<EpisodeIngestResult> {
    let mut warnings = Vec::new();
    let draft = request.into_draft(graph.default_group(), &mut warnings);
    let (name, reference_time) = (draft.name.clone(), draft.reference_time);

    let outcome = graph.ingest_episode(draft).await.inspect_err(|e| {
        error!(episode_name = %name, error = %e, "text episode ingestion failed");
    })?;
    let result = EpisodeIngestResult::from_outcome(outcome, name, reference_time, warnings);

    info!(
        episode = %result.episode_id,
        entities = result.entities_extracted,
        relations = result.relations_extracted,
        "episode added"
    );
    Ok(result)
}
