//! In-memory graph backend.
//!
//! A non-persistent [`GraphDriver`] for development and tests. Search mirrors
//! the Neo4j driver's shape: token-overlap ranking stands in for the full-text
//! index, cosine similarity over stored embeddings for the vector index.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use uuid::Uuid;

use crate::edges::{EntityEdge, EpisodicEdge};
use crate::errors::{GraphError, Result};
use crate::nodes::{EntityNode, EpisodicNode};
use crate::search::rank::{fuse, rerank_by_distance};
use crate::search::{EdgeHit, NodeHit, SearchHit, SearchQuery};
use crate::utils::{cosine_similarity, tokenize};

use super::GraphDriver;

/// Vector candidates at or below this cosine similarity are dropped.
const MIN_SIMILARITY: f64 = 0.5;

#[derive(Debug, Default)]
struct Store {
    episodes: Vec<EpisodicNode>,
    entities: Vec<EntityNode>,
    edges: Vec<EntityEdge>,
    mentions: Vec<EpisodicEdge>,
}

impl Store {
    fn has_entity(&self, uuid: Uuid) -> bool {
        self.entities.iter().any(|n| n.uuid == uuid)
    }
}

/// Thread-safe in-memory graph. Data lives as long as the value.
#[derive(Debug, Default)]
pub struct InMemoryDriver {
    store: RwLock<Store>,
}

impl InMemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn episode_count(&self) -> usize {
        self.store.read().map(|s| s.episodes.len()).unwrap_or(0)
    }

    pub fn entity_count(&self) -> usize {
        self.store.read().map(|s| s.entities.len()).unwrap_or(0)
    }

    pub fn edge_count(&self) -> usize {
        self.store.read().map(|s| s.edges.len()).unwrap_or(0)
    }

    pub fn mention_count(&self) -> usize {
        self.store.read().map(|s| s.mentions.len()).unwrap_or(0)
    }

    /// Snapshot of stored entities, in insertion order.
    pub fn entities(&self) -> Vec<EntityNode> {
        self.store.read().map(|s| s.entities.clone()).unwrap_or_default()
    }

    /// Snapshot of stored relationships, in insertion order.
    pub fn edges(&self) -> Vec<EntityEdge> {
        self.store.read().map(|s| s.edges.clone()).unwrap_or_default()
    }

    fn write<T>(&self, f: impl FnOnce(&mut Store) -> Result<T>) -> Result<T> {
        let mut store = self
            .store
            .write()
            .map_err(|_| GraphError::Driver("in-memory store lock poisoned".to_string()))?;
        f(&mut store)
    }

    fn read<T>(&self, f: impl FnOnce(&Store) -> T) -> Result<T> {
        let store = self
            .store
            .read()
            .map_err(|_| GraphError::Driver("in-memory store lock poisoned".to_string()))?;
        Ok(f(&store))
    }
}

impl GraphDriver for InMemoryDriver {
    async fn ping(&self) -> Result<()> {
        self.read(|_| ())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn build_indices(&self) -> Result<()> {
        Ok(())
    }

    async fn save_episode(&self, episode: &EpisodicNode) -> Result<()> {
        self.write(|s| {
            s.episodes.push(episode.clone());
            Ok(())
        })
    }

    async fn save_entity_node(&self, node: &EntityNode) -> Result<()> {
        self.write(|s| {
            s.entities.push(node.clone());
            Ok(())
        })
    }

    async fn save_entity_edge(&self, edge: &EntityEdge) -> Result<()> {
        self.write(|s| {
            for endpoint in [edge.source_node_uuid, edge.target_node_uuid] {
                if !s.has_entity(endpoint) {
                    return Err(GraphError::NodeNotFound(endpoint.to_string()));
                }
            }
            s.edges.push(edge.clone());
            Ok(())
        })
    }

    async fn save_episodic_edge(&self, edge: &EpisodicEdge) -> Result<()> {
        self.write(|s| {
            if !s.episodes.iter().any(|e| e.uuid == edge.source_node_uuid) {
                return Err(GraphError::NodeNotFound(edge.source_node_uuid.to_string()));
            }
            if !s.has_entity(edge.target_node_uuid) {
                return Err(GraphError::NodeNotFound(edge.target_node_uuid.to_string()));
            }
            s.mentions.push(edge.clone());
            Ok(())
        })
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        self.read(|s| search_store(s, query))
    }
}

fn search_store(store: &Store, query: &SearchQuery) -> Vec<SearchHit> {
    let tokens = tokenize(&query.text);
    let entities: Vec<&EntityNode> = store
        .entities
        .iter()
        .filter(|n| n.group_id == query.group_id)
        .collect();
    let edges: Vec<&EntityEdge> = store
        .edges
        .iter()
        .filter(|e| e.group_id == query.group_id)
        .collect();

    let mut rankings = vec![
        rank_by(&entities, |n| overlap(&tokens, &format!("{} {}", n.name, n.summary)), node_hit),
        rank_by(&edges, |e| overlap(&tokens, &format!("{} {}", e.name, e.fact)), edge_hit),
    ];
    if let Some(embedding) = &query.embedding {
        rankings.push(rank_by(
            &entities,
            |n| similarity(embedding, n.name_embedding.as_deref()),
            node_hit,
        ));
        rankings.push(rank_by(
            &edges,
            |e| similarity(embedding, e.fact_embedding.as_deref()),
            edge_hit,
        ));
    }

    let mut hits = fuse(rankings);
    if let Some(center) = query
        .center_node_uuid
        .as_deref()
        .and_then(|c| Uuid::parse_str(c).ok())
        .filter(|c| store.has_entity(*c))
    {
        hits = rerank_by_distance(hits, &hop_distances(center, &edges));
    }
    hits.truncate(query.limit);
    hits
}

/// Items with a positive score, best first.
fn rank_by<T>(
    items: &[&T],
    score: impl Fn(&T) -> f64,
    to_hit: impl Fn(&T) -> SearchHit,
) -> Vec<SearchHit> {
    let mut scored: Vec<(f64, &T)> = items
        .iter()
        .map(|item| (score(*item), *item))
        .filter(|(s, _)| *s > 0.0)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, item)| to_hit(item)).collect()
}

fn overlap(query_tokens: &[String], text: &str) -> f64 {
    let text_tokens = tokenize(text);
    query_tokens
        .iter()
        .filter(|t| text_tokens.contains(t))
        .count() as f64
}

fn similarity(query: &[f32], stored: Option<&[f32]>) -> f64 {
    match stored {
        Some(v) if v.len() == query.len() => {
            let score = cosine_similarity(query, v) as f64;
            if score > MIN_SIMILARITY { score } else { 0.0 }
        }
        _ => 0.0,
    }
}

fn node_hit(n: &EntityNode) -> SearchHit {
    SearchHit::Node(NodeHit {
        uuid: n.uuid,
        name: Some(n.name.clone()),
        labels: Some(n.labels.clone()),
        summary: Some(n.summary.clone()).filter(|s| !s.is_empty()),
        attributes: Some(n.attributes.clone()).filter(|a| !a.is_null()),
        score: None,
    })
}

fn edge_hit(e: &EntityEdge) -> SearchHit {
    SearchHit::Edge(EdgeHit {
        uuid: e.uuid,
        source_node_uuid: Some(e.source_node_uuid),
        target_node_uuid: Some(e.target_node_uuid),
        name: Some(e.name.clone()),
        fact: Some(e.fact.clone()),
        valid_at: e.valid_at,
        invalid_at: e.invalid_at,
        score: None,
    })
}

/// Undirected BFS hop counts from `center`.
fn hop_distances(center: Uuid, edges: &[&EntityEdge]) -> HashMap<Uuid, usize> {
    let mut adjacency: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for e in edges {
        adjacency.entry(e.source_node_uuid).or_default().push(e.target_node_uuid);
        adjacency.entry(e.target_node_uuid).or_default().push(e.source_node_uuid);
    }

    let mut distances = HashMap::from([(center, 0)]);
    let mut queue = VecDeque::from([center]);
    while let Some(current) = queue.pop_front() {
        let next = distances[&current] + 1;
        for neighbor in adjacency.get(&current).into_iter().flatten() {
            if !distances.contains_key(neighbor) {
                distances.insert(*neighbor, next);
                queue.push_back(*neighbor);
            }
        }
    }
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::hashed::HashedEmbedder;
    use crate::embedder::EmbedderClient;
    use serde_json::json;

    fn entity(name: &str, group: &str) -> EntityNode {
        EntityNode::new(name, group, vec!["Tool".to_string()], json!({}))
    }

    fn query(text: &str) -> SearchQuery {
        SearchQuery {
            text: text.to_string(),
            limit: 10,
            center_node_uuid: None,
            group_id: "g".to_string(),
            embedding: None,
        }
    }

    #[tokio::test]
    async fn edge_requires_stored_endpoints() {
        let driver = InMemoryDriver::new();
        let a = entity("Drill T1", "g");
        driver.save_entity_node(&a).await.unwrap();

        let missing = Uuid::new_v4();
        let edge = EntityEdge::new(a.uuid, missing, "USES", "a uses b", "g");
        let err = driver.save_entity_edge(&edge).await.unwrap_err();
        assert!(matches!(err, GraphError::NodeNotFound(id) if id == missing.to_string()));
        assert_eq!(driver.edge_count(), 0);
    }

    #[tokio::test]
    async fn search_matches_tokens_within_group() {
        let driver = InMemoryDriver::new();
        driver.save_entity_node(&entity("Cordless Drill", "g")).await.unwrap();
        driver.save_entity_node(&entity("Hydraulic Press", "g")).await.unwrap();
        driver.save_entity_node(&entity("Bench Drill", "other")).await.unwrap();

        let hits = driver.search(&query("drill")).await.unwrap();
        assert_eq!(hits.len(), 1);
        match &hits[0] {
            SearchHit::Node(n) => assert_eq!(n.name.as_deref(), Some("Cordless Drill")),
            other => panic!("expected node hit, got {other:?}"),
        }
        assert!(hits[0].score().is_some());
    }

    #[tokio::test]
    async fn vector_ranking_contributes_when_embedding_present() {
        let embedder = HashedEmbedder::new(64);
        let driver = InMemoryDriver::new();
        let mut node = entity("Spindle S-4", "g");
        node.name_embedding = Some(embedder.embed("Spindle S-4").await.unwrap());
        driver.save_entity_node(&node).await.unwrap();

        let mut q = query("s-4 spindle");
        q.embedding = Some(embedder.embed("s-4 spindle").await.unwrap());
        let hits = driver.search(&q).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].uuid(), node.uuid);
    }

    #[tokio::test]
    async fn center_node_reranks_by_distance() {
        let driver = InMemoryDriver::new();
        let center = entity("Project Falcon", "g");
        let near = entity("Drill alpha", "g");
        let far = entity("Drill beta", "g");
        for n in [&center, &near, &far] {
            driver.save_entity_node(n).await.unwrap();
        }
        driver
            .save_entity_edge(&EntityEdge::new(center.uuid, near.uuid, "USES", "Falcon uses alpha", "g"))
            .await
            .unwrap();
        driver
            .save_entity_edge(&EntityEdge::new(near.uuid, far.uuid, "PAIRS_WITH", "alpha pairs with the second bit", "g"))
            .await
            .unwrap();

        let mut q = query("drill beta");
        let plain = driver.search(&q).await.unwrap();
        assert_eq!(plain[0].uuid(), far.uuid);

        q.center_node_uuid = Some(center.uuid.to_string());
        let reranked = driver.search(&q).await.unwrap();
        assert_eq!(reranked[0].uuid(), near.uuid);
    }

    #[tokio::test]
    async fn unknown_center_is_ignored() {
        let driver = InMemoryDriver::new();
        driver.save_entity_node(&entity("Lathe", "g")).await.unwrap();
        let mut q = query("lathe");
        q.center_node_uuid = Some("not-a-uuid".to_string());
        assert_eq!(driver.search(&q).await.unwrap().len(), 1);
    }
}
