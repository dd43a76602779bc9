//! LLM-backed entity/relationship extraction.
//!
//! The model's reply is parsed leniently: a missing section stays `None`,
//! malformed items are skipped, and an unreadable reply yields an empty
//! [`ExtractedGraph`] rather than an error.

pub mod prompts;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::utils::{extract_json_from_response, normalize_whitespace, parse_flexible_datetime};
use chrono::{DateTime, Utc};

/// Relationship type used when the model leaves it blank.
pub const DEFAULT_RELATION_TYPE: &str = "RELATES_TO";

/// The graph a model reply describes. `None` means the section was absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedGraph {
    pub entities: Option<Vec<ExtractedEntity>>,
    pub relations: Option<Vec<ExtractedRelation>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedRelation {
    pub source: String,
    pub target: String,
    #[serde(default, alias = "type", alias = "relation")]
    pub relation_type: Option<String>,
    #[serde(default)]
    pub fact: Option<String>,
    #[serde(default)]
    pub valid_at: Option<String>,
    #[serde(default)]
    pub invalid_at: Option<String>,
}

impl ExtractedRelation {
    /// Relationship type in UPPER_SNAKE_CASE, defaulting to [`DEFAULT_RELATION_TYPE`].
    pub fn normalized_type(&self) -> String {
        let raw = self.relation_type.as_deref().unwrap_or_default();
        let name: String = normalize_whitespace(raw)
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        if name.trim_matches('_').is_empty() {
            DEFAULT_RELATION_TYPE.to_string()
        } else {
            name
        }
    }

    /// Fact sentence, synthesized from the endpoints when the model gave none.
    pub fn fact_text(&self) -> String {
        match self.fact.as_deref().map(normalize_whitespace) {
            Some(fact) if !fact.is_empty() => fact,
            _ => format!("{} {} {}", self.source, self.normalized_type(), self.target),
        }
    }

    pub fn valid_from(&self) -> Option<DateTime<Utc>> {
        self.valid_at.as_deref().and_then(parse_flexible_datetime)
    }

    pub fn invalid_from(&self) -> Option<DateTime<Utc>> {
        self.invalid_at.as_deref().and_then(parse_flexible_datetime)
    }
}

/// Parse a model reply into an [`ExtractedGraph`].
pub fn parse_reply(reply: &str) -> ExtractedGraph {
    let Some(json) = extract_json_from_response(reply) else {
        warn!("extraction reply contained no JSON");
        return ExtractedGraph::default();
    };
    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "extraction reply was not valid JSON");
            return ExtractedGraph::default();
        }
    };

    ExtractedGraph {
        entities: section(&value, &["entities", "nodes"]),
        relations: section(&value, &["relations", "relationships", "edges"]),
    }
}

/// Items of the first array found under `keys`, skipping ones that don't fit `T`.
fn section<T: for<'de> Deserialize<'de>>(value: &Value, keys: &[&str]) -> Option<Vec<T>> {
    let items = keys.iter().find_map(|k| value.get(*k)?.as_array())?;
    Some(
        items
            .iter()
            .filter_map(|item| match T::deserialize(item) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(error = %e, "skipping malformed extraction item");
                    None
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_reply() {
        let reply = r#"Sure:
```json
{"entities": [{"name": "Drill T1", "label": "Tool"}, {"name": "Project Falcon", "label": "Project", "summary": "Airframe retrofit"}],
 "relations": [{"source": "Project Falcon", "target": "Drill T1", "relation_type": "uses", "fact": "Project Falcon uses Drill T1"}]}
```"#;
        let graph = parse_reply(reply);
        let entities = graph.entities.expect("entities present");
        let relations = graph.relations.expect("relations present");
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[1].summary.as_deref(), Some("Airframe retrofit"));
        assert_eq!(relations[0].normalized_type(), "USES");
    }

    #[test]
    fn missing_section_stays_none() {
        let graph = parse_reply(r#"{"entities": [{"name": "Lathe L2"}]}"#);
        assert_eq!(graph.entities.map(|e| e.len()), Some(1));
        assert!(graph.relations.is_none());
    }

    #[test]
    fn alternative_section_names_are_accepted() {
        let graph = parse_reply(
            r#"{"nodes": [{"name": "A"}], "edges": [{"source": "A", "target": "A", "type": "part of"}]}"#,
        );
        assert_eq!(graph.entities.map(|e| e.len()), Some(1));
        let relations = graph.relations.expect("edges read as relations");
        assert_eq!(relations[0].normalized_type(), "PART_OF");
    }

    #[test]
    fn malformed_items_are_skipped() {
        let graph = parse_reply(r#"{"entities": [{"name": "ok"}, {"label": "nameless"}, 42]}"#);
        assert_eq!(graph.entities.map(|e| e.len()), Some(1));
    }

    #[test]
    fn unreadable_reply_is_empty_graph() {
        assert_eq!(parse_reply("I could not find anything."), ExtractedGraph::default());
        assert_eq!(parse_reply("{not json}"), ExtractedGraph::default());
    }

    #[test]
    fn relation_defaults() {
        let rel = ExtractedRelation {
            source: "Insert P-220".to_string(),
            target: "Holder H-9".to_string(),
            relation_type: None,
            fact: Some("   ".to_string()),
            valid_at: Some("2023-04-01".to_string()),
            invalid_at: Some("whenever".to_string()),
        };
        assert_eq!(rel.normalized_type(), DEFAULT_RELATION_TYPE);
        assert_eq!(rel.fact_text(), "Insert P-220 RELATES_TO Holder H-9");
        assert!(rel.valid_from().is_some());
        assert!(rel.invalid_from().is_none());
    }
}
