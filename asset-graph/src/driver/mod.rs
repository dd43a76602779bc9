//! Graph database driver abstraction.
//!
//! Defines the [`GraphDriver`] trait every backend satisfies, plus two
//! implementations:
//! - [`neo4j::Neo4jDriver`]: Neo4j over Bolt via `neo4rs`.
//! - [`memory::InMemoryDriver`]: process-local store for development and tests.

pub mod memory;
pub mod neo4j;

use std::future::Future;

use crate::edges::{EntityEdge, EpisodicEdge};
use crate::errors::Result;
use crate::nodes::{EntityNode, EpisodicNode};
use crate::search::{SearchHit, SearchQuery};

/// A graph database backend.
///
/// Writes are create-only: every call persists a new node or relationship.
/// Edge writes fail with [`GraphError::NodeNotFound`](crate::errors::GraphError::NodeNotFound)
/// when an endpoint is not stored.
pub trait GraphDriver: Send + Sync {
    /// Health check: verify connectivity to the database.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// Release connections. Later calls may fail.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;

    /// Create constraints and search indices if they do not exist.
    fn build_indices(&self) -> impl Future<Output = Result<()>> + Send;

    fn save_episode(&self, episode: &EpisodicNode) -> impl Future<Output = Result<()>> + Send;

    fn save_entity_node(&self, node: &EntityNode) -> impl Future<Output = Result<()>> + Send;

    fn save_entity_edge(&self, edge: &EntityEdge) -> impl Future<Output = Result<()>> + Send;

    fn save_episodic_edge(&self, edge: &EpisodicEdge) -> impl Future<Output = Result<()>> + Send;

    /// Hybrid search over entities and relationships in `query.group_id`.
    ///
    /// Full-text and (when `query.embedding` is set) vector rankings are fused
    /// with reciprocal-rank fusion; a center node reranks by hop distance.
    fn search(&self, query: &SearchQuery) -> impl Future<Output = Result<Vec<SearchHit>>> + Send;
}
