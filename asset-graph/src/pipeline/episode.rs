//! Episode Writer: opens the episode every ingestion request writes under.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::errors::Result;
use crate::graph::{EpisodeDraft, KnowledgeGraph};
use crate::nodes::{EpisodeType, EpisodicNode};
use crate::utils::parse_flexible_datetime;

/// Caller-facing description of an episode.
#[derive(Debug, Clone, Default)]
pub struct EpisodeRequest {
    pub name: String,
    pub body: String,
    pub source_description: String,
    /// Caller-supplied timestamp string; unparseable values fall back to now.
    pub reference_time: Option<String>,
    pub source: EpisodeType,
    pub group_id: Option<String>,
}

/// An episode persisted in the store, plus non-fatal notes gathered opening it.
#[derive(Debug, Clone)]
pub struct OpenedEpisode {
    pub episode: EpisodicNode,
    pub warnings: Vec<String>,
}

/// Parse `raw` permissively; a missing or blank value means now.
///
/// An unparseable value also means now, and adds a note to `warnings`.
pub fn resolve_reference_time(raw: Option<&str>, warnings: &mut Vec<String>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Utc::now();
    };
    match parse_flexible_datetime(raw) {
        Some(parsed) => parsed,
        None => {
            warn!(reference_time = raw, "unparseable reference_time, using current time");
            warnings.push(format!(
                "reference_time '{raw}' could not be parsed; current time used"
            ));
            Utc::now()
        }
    }
}

impl EpisodeRequest {
    /// Resolve the timestamp and partition into a store-ready draft.
    pub fn into_draft(self, default_group: &str, warnings: &mut Vec<String>) -> EpisodeDraft {
        let reference_time = resolve_reference_time(self.reference_time.as_deref(), warnings);
        EpisodeDraft {
            name: self.name,
            body: self.body,
            source: self.source,
            source_description: self.source_description,
            reference_time,
            group_id: self
                .group_id
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| default_group.to_string()),
        }
    }
}

/// Create the episode in the store. Failure here fails the whole request.
pub async fn open_episode<G: KnowledgeGraph>(graph: &G, request: EpisodeRequest) -> Result<OpenedEpisode> {
    let mut warnings = Vec::new();
    let draft = request.into_draft(graph.default_group(), &mut warnings);

    let episode = graph.add_episode_node(draft).await.inspect_err(|e| {
        error!(error = %e, "episode creation failed");
    })?;
    info!(
        episode = %episode.uuid,
        name = %episode.name,
        reference_time = %episode.valid_at,
        "episode opened"
    );
    Ok(OpenedEpisode { episode, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_timezone_aware_reference_time() {
        let mut warnings = Vec::new();
        let t = resolve_reference_time(Some("2024-03-05T08:30:00+02:00"), &mut warnings);
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 3, 5, 6, 30, 0).unwrap());
        assert!(warnings.is_empty());
    }

    #[test]
    fn malformed_reference_time_falls_back_with_warning() {
        let mut warnings = Vec::new();
        let before = Utc::now();
        let t = resolve_reference_time(Some("next tuesday-ish"), &mut warnings);
        assert!(t >= before);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("next tuesday-ish"));
    }

    #[test]
    fn blank_reference_time_is_now_without_warning() {
        let mut warnings = Vec::new();
        let before = Utc::now();
        assert!(resolve_reference_time(Some("  "), &mut warnings) >= before);
        assert!(resolve_reference_time(None, &mut warnings) >= before);
        assert!(warnings.is_empty());
    }

    #[test]
    fn draft_uses_default_group_when_unset() {
        let mut warnings = Vec::new();
        let draft = EpisodeRequest {
            name: "n".to_string(),
            group_id: Some(" ".to_string()),
            ..EpisodeRequest::default()
        }
        .into_draft("plant-7", &mut warnings);
        assert_eq!(draft.group_id, "plant-7");
        assert_eq!(draft.source, EpisodeType::Text);
    }
}
