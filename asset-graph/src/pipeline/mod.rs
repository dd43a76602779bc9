//! Ingestion pipeline.
//!
//! 1. **Open**: [`episode::open_episode`] persists the episode; a failure
//!    here aborts the request before anything else is written.
//! 2. **Build**: [`builder::build_graph`] writes caller-described nodes, then
//!    edges, recording per-item outcomes.
//! 3. **Ingest**: [`ingest::add_episode`] hands free text to the extraction
//!    model instead of steps 1–2.

pub mod builder;
pub mod episode;
pub mod ingest;

pub use builder::{
    build_episode_graph, build_graph, BuildReport, EdgeInput, EdgeOutcome, ItemStatus, NodeInput,
    NodeOutcome,
};
pub use episode::{open_episode, resolve_reference_time, EpisodeRequest, OpenedEpisode};
pub use ingest::{add_episode, EpisodeIngestResult, EPISODE_ID_PLACEHOLDER};
