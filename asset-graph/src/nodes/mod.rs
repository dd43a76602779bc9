//! Node types for the knowledge graph.
//!
//! - [`EntityNode`]: a manufacturing entity (tool, part, project, asset)
//! - [`EpisodicNode`]: one ingestion unit (uploaded document or batch request)

pub mod entity;
pub mod episodic;

pub use entity::EntityNode;
pub use episodic::{EpisodeType, EpisodicNode};
