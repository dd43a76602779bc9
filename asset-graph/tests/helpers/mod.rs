#![allow(dead_code)]

use asset_graph::driver::memory::InMemoryDriver;
use asset_graph::driver::GraphDriver;
use asset_graph::edges::{EntityEdge, EpisodicEdge};
use asset_graph::embedder::hashed::HashedEmbedder;
use asset_graph::errors::{GraphError, Result};
use asset_graph::llm_client::{LlmClient, Message};
use asset_graph::nodes::{EntityNode, EpisodicNode};
use asset_graph::search::{SearchHit, SearchQuery};
use asset_graph::AssetGraph;

/// In-memory driver that fails selected writes.
#[derive(Default)]
pub struct FlakyDriver {
    pub inner: InMemoryDriver,
    /// Entity names whose creation fails.
    pub failing_names: Vec<String>,
    /// Facts whose relationship write fails.
    pub failing_facts: Vec<String>,
    pub fail_episodes: bool,
    pub fail_search: bool,
}

impl FlakyDriver {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            failing_names: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_relations(facts: &[&str]) -> Self {
        Self {
            failing_facts: facts.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl GraphDriver for FlakyDriver {
    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    async fn build_indices(&self) -> Result<()> {
        self.inner.build_indices().await
    }

    async fn save_episode(&self, episode: &EpisodicNode) -> Result<()> {
        if self.fail_episodes {
            return Err(GraphError::Driver("connection refused".to_string()));
        }
        self.inner.save_episode(episode).await
    }

    async fn save_entity_node(&self, node: &EntityNode) -> Result<()> {
        if self.failing_names.contains(&node.name) {
            return Err(GraphError::Driver(format!("constraint violated for {}", node.name)));
        }
        self.inner.save_entity_node(node).await
    }

    async fn save_entity_edge(&self, edge: &EntityEdge) -> Result<()> {
        if self.failing_facts.contains(&edge.fact) {
            return Err(GraphError::Driver(format!("write timed out for '{}'", edge.fact)));
        }
        self.inner.save_entity_edge(edge).await
    }

    async fn save_episodic_edge(&self, edge: &EpisodicEdge) -> Result<()> {
        self.inner.save_episodic_edge(edge).await
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        if self.fail_search {
            return Err(GraphError::Search("index unavailable".to_string()));
        }
        self.inner.search(query).await
    }
}

/// LLM that always answers with the same text.
pub struct ScriptedLlm(pub String);

impl LlmClient for ScriptedLlm {
    async fn generate(&self, _messages: &[Message]) -> Result<String> {
        Ok(self.0.clone())
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub type TestGraph = AssetGraph<FlakyDriver, ScriptedLlm, HashedEmbedder>;

pub fn graph_with(driver: FlakyDriver) -> TestGraph {
    AssetGraph::new(driver, ScriptedLlm("{}".to_string()), HashedEmbedder::new(64))
}
