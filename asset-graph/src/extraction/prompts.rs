//! Prompt templates for entity/relationship extraction.

use crate::llm_client::Message;
use crate::nodes::EpisodicNode;
use crate::utils::truncate_with_ellipsis;

/// Episode bodies longer than this are cut before prompting.
pub const MAX_EPISODE_CHARS: usize = 24_000;

const SYSTEM: &str = "You are an information extraction engine for a manufacturing \
asset knowledge graph. You read plant documents, maintenance logs and messages and \
return the tools, parts, projects, assets, people and organizations they mention, \
together with the relationships between them. Reply with JSON only.";

const SCHEMA: &str = r#"{
  "entities": [
    {"name": "<canonical name>", "label": "<Tool|Part|Project|Asset|Person|Organization|...>", "summary": "<one sentence>"}
  ],
  "relations": [
    {"source": "<entity name>", "target": "<entity name>", "relation_type": "<UPPER_SNAKE_CASE>", "fact": "<one sentence>", "valid_at": "<ISO 8601 or null>", "invalid_at": "<ISO 8601 or null>"}
  ]
}"#;

/// Build the conversation asking the model to extract a graph from `episode`.
pub fn extract_graph(episode: &EpisodicNode) -> Vec<Message> {
    let body = truncate_with_ellipsis(&episode.content, MAX_EPISODE_CHARS);
    let user = format!(
        "Episode: {name}\n\
         Source: {source} ({kind})\n\
         Reference time: {reference}\n\n\
         <CONTENT>\n{body}\n</CONTENT>\n\n\
         Rules:\n\
         - Use the most specific, canonical name for each entity (serial numbers and model codes included).\n\
         - Every relation's source and target must be the name of an entity in your list.\n\
         - Resolve relative dates against the reference time; use null when unknown.\n\
         - Do not invent entities that the content does not mention.\n\n\
         Respond with a JSON object of this shape:\n{SCHEMA}",
        name = episode.name,
        source = episode.source_description,
        kind = episode.source,
        reference = episode.valid_at.to_rfc3339(),
    );
    vec![Message::system(SYSTEM), Message::user(user)]
}
