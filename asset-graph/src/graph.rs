//! The knowledge-graph client handle.
//!
//! [`KnowledgeGraph`] is the store contract the ingestion pipeline and search
//! facade are written against. [`AssetGraph`] implements it over a
//! [`GraphDriver`], an [`LlmClient`] for extraction and an [`EmbedderClient`]
//! for name/fact embeddings.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::driver::neo4j::Neo4jDriver;
use crate::driver::GraphDriver;
use crate::edges::{EntityEdge, EpisodicEdge};
use crate::embedder::openai::OpenAiEmbedder;
use crate::embedder::EmbedderClient;
use crate::errors::Result;
use crate::extraction::{self, prompts, ExtractedEntity};
use crate::llm_client::openai::{CacheConfig, OpenAiClient};
use crate::llm_client::LlmClient;
use crate::nodes::{EntityNode, EpisodeType, EpisodicNode};
use crate::search::{SearchHit, SearchQuery};
use crate::types::{GraphConfig, DEFAULT_GROUP_ID};

/// Input for a new episode node.
#[derive(Debug, Clone)]
pub struct EpisodeDraft {
    pub name: String,
    pub body: String,
    pub source: EpisodeType,
    pub source_description: String,
    pub reference_time: DateTime<Utc>,
    pub group_id: String,
}

/// Input for a new entity node.
#[derive(Debug, Clone, Default)]
pub struct EntityDraft {
    pub name: String,
    pub labels: Vec<String>,
    pub summary: String,
    pub attributes: Value,
}

/// Input for a new relationship between two stored entities.
#[derive(Debug, Clone)]
pub struct RelationDraft {
    pub source: Uuid,
    pub target: Uuid,
    pub relation_type: String,
    pub fact: String,
    pub attributes: Value,
    pub valid_at: Option<DateTime<Utc>>,
    pub invalid_at: Option<DateTime<Utc>>,
}

/// What text ingestion reports back. Every field is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub episode_uuid: Option<Uuid>,
    pub entity_count: Option<usize>,
    pub relation_count: Option<usize>,
}

/// Store contract used by the pipeline and the search facade.
///
/// Every write is committed individually as it happens.
pub trait KnowledgeGraph: Send + Sync {
    /// Partition used when a request names none.
    fn default_group(&self) -> &str;

    fn add_episode_node(&self, draft: EpisodeDraft) -> impl Future<Output = Result<EpisodicNode>> + Send;

    /// Create an entity under `episode`. Always creates a new node.
    fn add_entity(
        &self,
        episode: &EpisodicNode,
        draft: EntityDraft,
    ) -> impl Future<Output = Result<EntityNode>> + Send;

    fn add_relation(
        &self,
        episode: &EpisodicNode,
        draft: RelationDraft,
    ) -> impl Future<Output = Result<EntityEdge>> + Send;

    /// Store an episode and let the extraction model populate the graph from its body.
    fn ingest_episode(&self, draft: EpisodeDraft) -> impl Future<Output = Result<ExtractionOutcome>> + Send;

    fn search(&self, query: SearchQuery) -> impl Future<Output = Result<Vec<SearchHit>>> + Send;

    /// Verify the store is reachable.
    fn health(&self) -> impl Future<Output = Result<()>> + Send;

    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

/// [`KnowledgeGraph`] over a driver, an extraction model and an embedder.
pub struct AssetGraph<D, L, E> {
    driver: D,
    llm: L,
    embedder: E,
    group_id: String,
}

impl<D, L, E> AssetGraph<D, L, E>
where
    D: GraphDriver,
    L: LlmClient,
    E: EmbedderClient,
{
    pub fn new(driver: D, llm: L, embedder: E) -> Self {
        Self {
            driver,
            llm,
            embedder,
            group_id: DEFAULT_GROUP_ID.to_string(),
        }
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn llm_model(&self) -> &str {
        self.llm.model()
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model()
    }

    /// Create-time setup: indices and constraints.
    pub async fn build_indices(&self) -> Result<()> {
        self.driver.build_indices().await
    }

    /// Save the extracted entities, one node per distinct name (case-insensitive).
    async fn save_extracted_entities(
        &self,
        episode: &EpisodicNode,
        entities: Vec<ExtractedEntity>,
    ) -> HashMap<String, Uuid> {
        let mut by_name: HashMap<String, Uuid> = HashMap::new();
        for entity in entities {
            let key = entity.name.trim().to_lowercase();
            if key.is_empty() || by_name.contains_key(&key) {
                continue;
            }
            let draft = EntityDraft {
                name: entity.name.trim().to_string(),
                labels: entity.label.into_iter().collect(),
                summary: entity.summary.unwrap_or_default(),
                attributes: Value::Object(Default::default()),
            };
            match self.add_entity(episode, draft).await {
                Ok(node) => {
                    by_name.insert(key, node.uuid);
                }
                Err(e) => warn!(episode = %episode.uuid, entity = %entity.name, error = %e, "extracted entity not saved"),
            }
        }
        by_name
    }
}

/// Neo4j storage with OpenAI extraction and embeddings.
pub type Neo4jAssetGraph = AssetGraph<Neo4jDriver, OpenAiClient, OpenAiEmbedder>;

impl Neo4jAssetGraph {
    /// Connect, verify the store and ensure indices.
    ///
    /// The driver is closed again if anything after connecting fails.
    pub async fn from_config(config: &GraphConfig) -> Result<Self> {
        let driver = Neo4jDriver::from_config(config).await?;
        let ready = async {
            driver.ping().await?;
            driver.build_indices().await
        };
        if let Err(e) = ready.await {
            if let Err(close_err) = driver.close().await {
                warn!(error = %close_err, "closing Neo4j driver after failed setup");
            }
            return Err(e);
        }

        let key = config.openai_api_key.as_str();
        let (llm, embedder) = match config.openai_base_url.as_deref() {
            Some(base) => (
                OpenAiClient::with_base_url(key, &config.model_name, base, CacheConfig::default()),
                OpenAiEmbedder::with_base_url(key, &config.embedding_model, base),
            ),
            None => (
                OpenAiClient::new(key, &config.model_name, CacheConfig::default()),
                OpenAiEmbedder::new(key, &config.embedding_model),
            ),
        };

        Ok(AssetGraph::new(driver, llm, embedder.with_dim(config.embedding_dim))
            .with_group_id(config.default_group()))
    }
}

impl<D, L, E> KnowledgeGraph for AssetGraph<D, L, E>
where
    D: GraphDriver,
    L: LlmClient,
    E: EmbedderClient,
{
    fn default_group(&self) -> &str {
        &self.group_id
    }

    async fn add_episode_node(&self, draft: EpisodeDraft) -> Result<EpisodicNode> {
        let episode = EpisodicNode {
            uuid: Uuid::new_v4(),
            name: draft.name,
            group_id: draft.group_id,
            labels: vec![],
            created_at: Utc::now(),
            source: draft.source,
            source_description: draft.source_description,
            content: draft.body,
            valid_at: draft.reference_time,
            entity_edges: vec![],
        };
        self.driver.save_episode(&episode).await?;
        debug!(episode = %episode.uuid, name = %episode.name, "episode node saved");
        Ok(episode)
    }

    async fn add_entity(&self, episode: &EpisodicNode, draft: EntityDraft) -> Result<EntityNode> {
        let mut node = EntityNode::new(draft.name, episode.group_id.clone(), draft.labels, draft.attributes);
        node.summary = draft.summary;
        node.name_embedding = Some(self.embedder.embed(&node.name).await?);
        self.driver.save_entity_node(&node).await?;

        let mention = EpisodicEdge::mentions(episode.uuid, node.uuid, episode.group_id.clone());
        if let Err(e) = self.driver.save_episodic_edge(&mention).await {
            warn!(episode = %episode.uuid, node = %node.uuid, error = %e, "mention edge not saved");
        }
        Ok(node)
    }

    async fn add_relation(&self, episode: &EpisodicNode, draft: RelationDraft) -> Result<EntityEdge> {
        let mut edge = EntityEdge::new(
            draft.source,
            draft.target,
            draft.relation_type,
            draft.fact,
            episode.group_id.clone(),
        );
        edge.episodes = vec![episode.uuid];
        edge.attributes = draft.attributes;
        edge.valid_at = draft.valid_at;
        edge.invalid_at = draft.invalid_at;
        edge.fact_embedding = Some(self.embedder.embed(&edge.fact).await?);
        self.driver.save_entity_edge(&edge).await?;
        Ok(edge)
    }

    async fn ingest_episode(&self, draft: EpisodeDraft) -> Result<ExtractionOutcome> {
        let episode = self.add_episode_node(draft).await?;
        let reply = self.llm.generate(&prompts::extract_graph(&episode)).await?;
        let extracted = extraction::parse_reply(&reply);

        let entity_count = extracted.entities.as_ref().map(Vec::len);
        let by_name = match extracted.entities {
            Some(entities) => self.save_extracted_entities(&episode, entities).await,
            None => HashMap::new(),
        };

        let mut relation_count = None;
        if let Some(relations) = extracted.relations {
            let mut saved = 0;
            for relation in relations {
                let source = by_name.get(&relation.source.trim().to_lowercase());
                let target = by_name.get(&relation.target.trim().to_lowercase());
                let (Some(&source), Some(&target)) = (source, target) else {
                    warn!(episode = %episode.uuid, source = %relation.source, target = %relation.target, "extracted relation names an unknown entity");
                    continue;
                };
                let draft = RelationDraft {
                    source,
                    target,
                    relation_type: relation.normalized_type(),
                    fact: relation.fact_text(),
                    attributes: Value::Object(Default::default()),
                    valid_at: relation.valid_from(),
                    invalid_at: relation.invalid_from(),
                };
                match self.add_relation(&episode, draft).await {
                    Ok(_) => saved += 1,
                    Err(e) => warn!(episode = %episode.uuid, error = %e, "extracted relation not saved"),
                }
            }
            relation_count = Some(saved);
        }

        info!(
            episode = %episode.uuid,
            entities = by_name.len(),
            relations = relation_count.unwrap_or(0),
            "text episode ingested"
        );
        Ok(ExtractionOutcome {
            episode_uuid: Some(episode.uuid),
            entity_count: entity_count.map(|_| by_name.len()),
            relation_count,
        })
    }

    async fn search(&self, mut query: SearchQuery) -> Result<Vec<SearchHit>> {
        if query.embedding.is_none() && !query.text.trim().is_empty() {
            query.embedding = Some(self.embedder.embed(&query.text).await?);
        }
        self.driver.search(&query).await
    }

    async fn health(&self) -> Result<()> {
        self.driver.ping().await
    }

    async fn close(&self) -> Result<()> {
        self.driver.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::memory::InMemoryDriver;
    use crate::embedder::hashed::HashedEmbedder;
    use crate::llm_client::Message;

    struct CannedLlm(&'static str);

    impl LlmClient for CannedLlm {
        async fn generate(&self, _messages: &[Message]) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    fn graph(reply: &'static str) -> AssetGraph<InMemoryDriver, CannedLlm, HashedEmbedder> {
        AssetGraph::new(InMemoryDriver::new(), CannedLlm(reply), HashedEmbedder::new(32))
    }

    fn draft(body: &str) -> EpisodeDraft {
        EpisodeDraft {
            name: "maintenance-log".to_string(),
            body: body.to_string(),
            source: EpisodeType::Text,
            source_description: "CMMS export".to_string(),
            reference_time: Utc::now(),
            group_id: "plant-7".to_string(),
        }
    }

    #[tokio::test]
    async fn entities_get_embeddings_and_mentions() {
        let g = graph("{}");
        let episode = g.add_episode_node(draft("")).await.unwrap();
        let node = g
            .add_entity(
                &episode,
                EntityDraft {
                    name: "Drill T1".to_string(),
                    labels: vec!["Tool".to_string()],
                    ..EntityDraft::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(node.group_id, "plant-7");
        assert_eq!(node.labels, vec!["Tool".to_string(), "Entity".to_string()]);
        assert_eq!(node.name_embedding.as_ref().map(Vec::len), Some(32));
        assert_eq!(g.driver().mention_count(), 1);
    }

    #[tokio::test]
    async fn ingest_saves_extracted_graph() {
        let g = graph(
            r#"{"entities": [{"name": "Drill T1", "label": "Tool"}, {"name": "Project Falcon", "label": "Project"}, {"name": "drill t1"}],
                "relations": [{"source": "Project Falcon", "target": "Drill T1", "relation_type": "uses"},
                              {"source": "Project Falcon", "target": "Ghost", "relation_type": "uses"}]}"#,
        );
        let outcome = g.ingest_episode(draft("Falcon uses drill T1")).await.unwrap();

        assert!(outcome.episode_uuid.is_some());
        assert_eq!(outcome.entity_count, Some(2));
        assert_eq!(outcome.relation_count, Some(1));
        assert_eq!(g.driver().entity_count(), 2);
        let edges = g.driver().edges();
        assert_eq!(edges[0].name, "USES");
        assert_eq!(edges[0].fact, "Project Falcon USES Drill T1");
    }

    #[tokio::test]
    async fn ingest_reports_missing_sections_as_unknown() {
        let g = graph("nothing to see here");
        let outcome = g.ingest_episode(draft("")).await.unwrap();
        assert!(outcome.episode_uuid.is_some());
        assert_eq!(outcome.entity_count, None);
        assert_eq!(outcome.relation_count, None);
        assert_eq!(g.driver().episode_count(), 1);
    }

    #[tokio::test]
    async fn relation_to_unknown_node_fails() {
        let g = graph("{}");
        let episode = g.add_episode_node(draft("")).await.unwrap();
        let result = g
            .add_relation(
                &episode,
                RelationDraft {
                    source: Uuid::new_v4(),
                    target: Uuid::new_v4(),
                    relation_type: "USES".to_string(),
                    fact: "x uses y".to_string(),
                    attributes: Value::Null,
                    valid_at: None,
                    invalid_at: None,
                },
            )
            .await;
        assert!(result.is_err());
    }
}
