//! Edge types for the knowledge graph.
//!
//! - [`EntityEdge`]: RELATES_TO fact between two entities (bi-temporal)
//! - [`EpisodicEdge`]: MENTIONS link from an episode to an entity it introduced

pub mod entity;
pub mod episodic;

pub use entity::EntityEdge;
pub use episodic::EpisodicEdge;
