//! HTTP facade over the manufacturing asset graph.
//!
//! Routes are generic over [`asset_graph::KnowledgeGraph`] so the binary runs
//! them against Neo4j while tests use the in-memory driver.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, ServiceInfo};
