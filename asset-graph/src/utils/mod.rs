//! Shared utilities.
//!
//! Includes:
//! - Date/time helpers (permissive reference-time parsing, Cypher timestamps)
//! - Vector similarity
//! - Text helpers (tokenizing, JSON extraction from LLM output, Lucene escaping)

pub mod datetime;
pub mod similarity;
pub mod text;

pub use datetime::{format_neo4j_datetime, parse_flexible_datetime};
pub use similarity::{cosine_similarity, normalize_l2};
pub use text::{
    extract_json_from_response, lucene_sanitize, normalize_whitespace, tokenize,
    truncate_with_ellipsis,
};
