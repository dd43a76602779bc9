//! # asset-graph
//!
//! Episodic knowledge graph for manufacturing assets: tools, parts, projects
//! and the relationships between them, grouped into time-stamped episodes.
//!
//! ## Architecture
//!
//! - **Episodes**: every ingestion request writes under one episode node,
//!   opened before anything else.
//! - **Batch building**: caller-described nodes and edges, with per-item
//!   failure accounting and request-scoped id resolution.
//! - **Text ingestion**: an LLM extracts entities and relations from free text.
//! - **Hybrid retrieval**: full-text + vector cosine similarity fused with RRF,
//!   optionally reranked by graph distance from a center node.

pub mod edges;
pub mod errors;
pub mod nodes;
pub mod types;

pub mod driver;
pub mod embedder;
pub mod llm_client;

pub mod extraction;
pub mod graph;
pub mod pipeline;
pub mod search;

pub mod utils;

pub use errors::{GraphError, LlmError, Result};
pub use graph::{AssetGraph, KnowledgeGraph};
pub use types::GraphConfig;
