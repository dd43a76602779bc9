//! Neo4j graph driver implementation.
//!
//! Uses `neo4rs` 0.8 for async, pooled Bolt connections.
//!
//! Layout in the database:
//! - `(:Episodic)` nodes for episodes.
//! - `(:Entity:<Label>...)` nodes for entities; caller labels are sanitized
//!   before interpolation since Cypher cannot parameterize labels.
//! - `[:RELATES_TO {name, fact, ...}]` between entities; the relationship type
//!   lives in the `name` property so a single full-text index covers all edges.
//! - `[:MENTIONS]` from an episode to each entity it introduced.
//!
//! Timestamps are stored as fixed-width UTC strings, attributes as JSON text.

use std::collections::HashMap;

use neo4rs::{query, ConfigBuilder, Graph, Query, Row};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::edges::{EntityEdge, EpisodicEdge};
use crate::errors::{GraphError, Result};
use crate::nodes::entity::ENTITY_LABEL;
use crate::nodes::{EntityNode, EpisodicNode};
use crate::search::rank::{fuse, rerank_by_distance};
use crate::search::{EdgeHit, NodeHit, SearchHit, SearchQuery};
use crate::types::GraphConfig;
use crate::utils::{format_neo4j_datetime, lucene_sanitize, parse_flexible_datetime};

use super::GraphDriver;

/// Full-text index over entity names and summaries.
pub const NODE_FULLTEXT_INDEX: &str = "node_name_and_summary";
/// Full-text index over relationship names and facts.
pub const EDGE_FULLTEXT_INDEX: &str = "edge_name_and_fact";

/// Vector candidates below this cosine similarity are dropped.
const MIN_SIMILARITY: f64 = 0.5;
/// Deepest path considered when reranking around a center node.
const MAX_CENTER_DEPTH: usize = 4;

const INDEX_STATEMENTS: &[&str] = &[
    "CREATE CONSTRAINT entity_uuid IF NOT EXISTS FOR (n:Entity) REQUIRE n.uuid IS UNIQUE",
    "CREATE CONSTRAINT episodic_uuid IF NOT EXISTS FOR (n:Episodic) REQUIRE n.uuid IS UNIQUE",
    "CREATE INDEX entity_group_id IF NOT EXISTS FOR (n:Entity) ON (n.group_id)",
    "CREATE INDEX episodic_group_id IF NOT EXISTS FOR (n:Episodic) ON (n.group_id)",
    "CREATE INDEX relates_to_uuid IF NOT EXISTS FOR ()-[e:RELATES_TO]-() ON (e.uuid)",
    "CREATE FULLTEXT INDEX node_name_and_summary IF NOT EXISTS FOR (n:Entity) ON EACH [n.name, n.summary]",
    "CREATE FULLTEXT INDEX edge_name_and_fact IF NOT EXISTS FOR ()-[e:RELATES_TO]-() ON EACH [e.name, e.fact]",
];

/// Neo4j-backed [`GraphDriver`].
#[derive(Clone)]
pub struct Neo4jDriver {
    graph: Graph,
}

impl std::fmt::Debug for Neo4jDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jDriver").finish_non_exhaustive()
    }
}

impl Neo4jDriver {
    /// Open a connection pool. Does not verify the server is reachable; see [`GraphDriver::ping`].
    pub async fn connect(
        uri: &str,
        user: &str,
        password: &str,
        database: Option<&str>,
    ) -> Result<Self> {
        let mut builder = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password);
        if let Some(db) = database {
            builder = builder.db(db);
        }
        let graph = Graph::connect(builder.build()?).await?;
        info!(uri, "connected to Neo4j");
        Ok(Self { graph })
    }

    pub async fn from_config(config: &GraphConfig) -> Result<Self> {
        Self::connect(
            &config.neo4j_uri,
            &config.neo4j_user,
            &config.neo4j_password,
            config.neo4j_database.as_deref(),
        )
        .await
    }

    async fn fetch(&self, q: Query) -> Result<Vec<Row>> {
        let mut stream = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Entity uuids among `ids` that exist in the database.
    async fn existing_entities(&self, ids: &[Uuid]) -> Result<Vec<String>> {
        let q = query("MATCH (n:Entity) WHERE n.uuid IN $ids RETURN n.uuid AS uuid")
            .param("ids", ids.iter().map(Uuid::to_string).collect::<Vec<_>>());
        let rows = self.fetch(q).await?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get::<String>("uuid").ok())
            .collect())
    }

    async fn fulltext_nodes(&self, lucene: &str, request: &SearchQuery) -> Result<Vec<SearchHit>> {
        let q = query(
            "CALL db.index.fulltext.queryNodes($index, $query, {limit: $candidates})
             YIELD node AS n, score
             WHERE n.group_id = $group_id
             RETURN n.uuid AS uuid, n.name AS name, labels(n) AS labels, n.summary AS summary,
                    n.attributes AS attributes, score
             ORDER BY score DESC
             LIMIT $limit",
        )
        .param("index", NODE_FULLTEXT_INDEX)
        .param("query", lucene)
        .param("candidates", candidate_limit(request.limit))
        .param("group_id", request.group_id.as_str())
        .param("limit", request.limit as i64);
        Ok(self.fetch(q).await?.iter().filter_map(node_hit_from_row).collect())
    }

    async fn fulltext_edges(&self, lucene: &str, request: &SearchQuery) -> Result<Vec<SearchHit>> {
        let q = query(
            "CALL db.index.fulltext.queryRelationships($index, $query, {limit: $candidates})
             YIELD relationship AS e, score
             WHERE e.group_id = $group_id
             RETURN e.uuid AS uuid, startNode(e).uuid AS source, endNode(e).uuid AS target,
                    e.name AS name, e.fact AS fact, e.valid_at AS valid_at, e.invalid_at AS invalid_at, score
             ORDER BY score DESC
             LIMIT $limit",
        )
        .param("index", EDGE_FULLTEXT_INDEX)
        .param("query", lucene)
        .param("candidates", candidate_limit(request.limit))
        .param("group_id", request.group_id.as_str())
        .param("limit", request.limit as i64);
        Ok(self.fetch(q).await?.iter().filter_map(edge_hit_from_row).collect())
    }

    async fn similar_nodes(&self, embedding: &[f32], request: &SearchQuery) -> Result<Vec<SearchHit>> {
        let q = query(
            "MATCH (n:Entity)
             WHERE n.group_id = $group_id AND n.name_embedding IS NOT NULL
             WITH n, vector.similarity.cosine(n.name_embedding, $embedding) AS score
             WHERE score > $min_score
             RETURN n.uuid AS uuid, n.name AS name, labels(n) AS labels, n.summary AS summary,
                    n.attributes AS attributes, score
             ORDER BY score DESC
             LIMIT $limit",
        )
        .param("group_id", request.group_id.as_str())
        .param("embedding", embedding_to_f64(embedding))
        .param("min_score", MIN_SIMILARITY)
        .param("limit", request.limit as i64);
        Ok(self.fetch(q).await?.iter().filter_map(node_hit_from_row).collect())
    }

    async fn similar_edges(&self, embedding: &[f32], request: &SearchQuery) -> Result<Vec<SearchHit>> {
        let q = query(
            "MATCH (a:Entity)-[e:RELATES_TO]->(b:Entity)
             WHERE e.group_id = $group_id AND e.fact_embedding IS NOT NULL
             WITH a, e, b, vector.similarity.cosine(e.fact_embedding, $embedding) AS score
             WHERE score > $min_score
             RETURN e.uuid AS uuid, a.uuid AS source, b.uuid AS target,
                    e.name AS name, e.fact AS fact, e.valid_at AS valid_at, e.invalid_at AS invalid_at, score
             ORDER BY score DESC
             LIMIT $limit",
        )
        .param("group_id", request.group_id.as_str())
        .param("embedding", embedding_to_f64(embedding))
        .param("min_score", MIN_SIMILARITY)
        .param("limit", request.limit as i64);
        Ok(self.fetch(q).await?.iter().filter_map(edge_hit_from_row).collect())
    }

    /// Hop distances from `center` to the entities `hits` touch. Empty when the center is unknown.
    async fn center_distances(&self, center: &str, hits: &[SearchHit]) -> Result<HashMap<Uuid, usize>> {
        let Ok(center_uuid) = Uuid::parse_str(center) else {
            return Ok(HashMap::new());
        };
        if self.existing_entities(&[center_uuid]).await?.is_empty() {
            return Ok(HashMap::new());
        }

        let mut targets: Vec<String> = Vec::new();
        for hit in hits {
            let ids = match hit {
                SearchHit::Node(n) => vec![Some(n.uuid)],
                SearchHit::Edge(e) => vec![e.source_node_uuid, e.target_node_uuid],
            };
            for id in ids.into_iter().flatten().filter(|id| *id != center_uuid) {
                let id = id.to_string();
                if !targets.contains(&id) {
                    targets.push(id);
                }
            }
        }

        let mut distances = HashMap::from([(center_uuid, 0)]);
        if targets.is_empty() {
            return Ok(distances);
        }

        let cypher = format!(
            "MATCH (c:Entity {{uuid: $center}})
             UNWIND $targets AS target
             MATCH (n:Entity {{uuid: target}})
             MATCH p = shortestPath((c)-[:RELATES_TO*..{MAX_CENTER_DEPTH}]-(n))
             RETURN n.uuid AS uuid, length(p) AS hops"
        );
        let q = query(&cypher)
            .param("center", center)
            .param("targets", targets);
        for row in self.fetch(q).await? {
            let uuid = row.get::<String>("uuid").ok().and_then(|s| Uuid::parse_str(&s).ok());
            let hops = row.get::<i64>("hops").ok();
            if let (Some(uuid), Some(hops)) = (uuid, hops) {
                distances.insert(uuid, hops.max(0) as usize);
            }
        }
        Ok(distances)
    }
}

impl GraphDriver for Neo4jDriver {
    async fn ping(&self) -> Result<()> {
        self.graph.run(query("RETURN 1")).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // neo4rs releases pooled connections on drop
        debug!("closing Neo4j driver");
        Ok(())
    }

    async fn build_indices(&self) -> Result<()> {
        for statement in INDEX_STATEMENTS {
            self.graph.run(query(statement)).await?;
        }
        info!(count = INDEX_STATEMENTS.len(), "Neo4j indices ensured");
        Ok(())
    }

    async fn save_episode(&self, episode: &EpisodicNode) -> Result<()> {
        let q = query(
            "CREATE (e:Episodic {
                uuid: $uuid, name: $name, group_id: $group_id, source: $source,
                source_description: $source_description, content: $content,
                valid_at: $valid_at, created_at: $created_at, entity_edges: $entity_edges
             })",
        )
        .param("uuid", episode.uuid.to_string())
        .param("name", episode.name.as_str())
        .param("group_id", episode.group_id.as_str())
        .param("source", episode.source.as_str())
        .param("source_description", episode.source_description.as_str())
        .param("content", episode.content.as_str())
        .param("valid_at", format_neo4j_datetime(&episode.valid_at))
        .param("created_at", format_neo4j_datetime(&episode.created_at))
        .param(
            "entity_edges",
            episode.entity_edges.iter().map(Uuid::to_string).collect::<Vec<_>>(),
        );
        self.graph.run(q).await?;
        debug!(uuid = %episode.uuid, "episode saved");
        Ok(())
    }

    async fn save_entity_node(&self, node: &EntityNode) -> Result<()> {
        let cypher = entity_create_cypher(node.domain_labels(), node.name_embedding.is_some());
        let mut q = query(&cypher)
            .param("uuid", node.uuid.to_string())
            .param("name", node.name.as_str())
            .param("group_id", node.group_id.as_str())
            .param("summary", node.summary.as_str())
            .param("labels", node.labels.clone())
            .param("attributes", serde_json::to_string(&node.attributes)?)
            .param("created_at", format_neo4j_datetime(&node.created_at));
        if let Some(embedding) = &node.name_embedding {
            q = q.param("name_embedding", embedding_to_f64(embedding));
        }
        self.graph.run(q).await?;
        debug!(uuid = %node.uuid, name = %node.name, "entity saved");
        Ok(())
    }

    async fn save_entity_edge(&self, edge: &EntityEdge) -> Result<()> {
        let mut cypher = String::from(
            "MATCH (a:Entity {uuid: $source}), (b:Entity {uuid: $target})
             CREATE (a)-[e:RELATES_TO {
                uuid: $uuid, name: $name, fact: $fact, group_id: $group_id,
                episodes: $episodes, attributes: $attributes, created_at: $created_at
             }]->(b)",
        );
        let optional = [
            ("valid_at", edge.valid_at.as_ref().map(format_neo4j_datetime)),
            ("invalid_at", edge.invalid_at.as_ref().map(format_neo4j_datetime)),
            ("expired_at", edge.expired_at.as_ref().map(format_neo4j_datetime)),
        ];
        for (key, value) in &optional {
            if value.is_some() {
                cypher.push_str(&format!("\nSET e.{key} = ${key}"));
            }
        }
        if edge.fact_embedding.is_some() {
            cypher.push_str("\nSET e.fact_embedding = $fact_embedding");
        }
        cypher.push_str("\nRETURN e.uuid AS uuid");

        let mut q = query(&cypher)
            .param("source", edge.source_node_uuid.to_string())
            .param("target", edge.target_node_uuid.to_string())
            .param("uuid", edge.uuid.to_string())
            .param("name", edge.name.as_str())
            .param("fact", edge.fact.as_str())
            .param("group_id", edge.group_id.as_str())
            .param("episodes", edge.episodes.iter().map(Uuid::to_string).collect::<Vec<_>>())
            .param("attributes", serde_json::to_string(&edge.attributes)?)
            .param("created_at", format_neo4j_datetime(&edge.created_at));
        for (key, value) in optional {
            if let Some(value) = value {
                q = q.param(key, value);
            }
        }
        if let Some(embedding) = &edge.fact_embedding {
            q = q.param("fact_embedding", embedding_to_f64(embedding));
        }

        if self.fetch(q).await?.is_empty() {
            let found = self
                .existing_entities(&[edge.source_node_uuid, edge.target_node_uuid])
                .await?;
            let missing = [edge.source_node_uuid, edge.target_node_uuid]
                .into_iter()
                .map(|id| id.to_string())
                .find(|id| !found.contains(id))
                .unwrap_or_else(|| edge.source_node_uuid.to_string());
            return Err(GraphError::NodeNotFound(missing));
        }
        debug!(uuid = %edge.uuid, name = %edge.name, "relationship saved");
        Ok(())
    }

    async fn save_episodic_edge(&self, edge: &EpisodicEdge) -> Result<()> {
        let q = query(
            "MATCH (ep:Episodic {uuid: $episode}), (n:Entity {uuid: $entity})
             CREATE (ep)-[m:MENTIONS {uuid: $uuid, group_id: $group_id, created_at: $created_at}]->(n)
             RETURN m.uuid AS uuid",
        )
        .param("episode", edge.source_node_uuid.to_string())
        .param("entity", edge.target_node_uuid.to_string())
        .param("uuid", edge.uuid.to_string())
        .param("group_id", edge.group_id.as_str())
        .param("created_at", format_neo4j_datetime(&edge.created_at));

        if self.fetch(q).await?.is_empty() {
            return Err(GraphError::NodeNotFound(format!(
                "{} -> {}",
                edge.source_node_uuid, edge.target_node_uuid
            )));
        }
        Ok(())
    }

    async fn search(&self, request: &SearchQuery) -> Result<Vec<SearchHit>> {
        let mut rankings = Vec::new();

        let lucene = lucene_sanitize(&request.text);
        if !lucene.trim().is_empty() {
            rankings.push(self.fulltext_nodes(&lucene, request).await?);
            rankings.push(self.fulltext_edges(&lucene, request).await?);
        }
        if let Some(embedding) = &request.embedding {
            rankings.push(self.similar_nodes(embedding, request).await?);
            rankings.push(self.similar_edges(embedding, request).await?);
        }

        let mut hits = fuse(rankings);
        if let Some(center) = request.center_node_uuid.as_deref() {
            let distances = self.center_distances(center, &hits).await?;
            if distances.is_empty() {
                warn!(center, "center node not found; keeping fused order");
            } else {
                hits = rerank_by_distance(hits, &distances);
            }
        }
        hits.truncate(request.limit);
        Ok(hits)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn candidate_limit(limit: usize) -> i64 {
    (limit.max(1) * 2) as i64
}

fn embedding_to_f64(embedding: &[f32]) -> Vec<f64> {
    embedding.iter().map(|&v| v as f64).collect()
}

/// Backtick-quoted label safe for interpolation, or `None` when nothing usable remains.
fn sanitize_label(label: &str) -> Option<String> {
    let cleaned: String = label
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    (!cleaned.is_empty()).then(|| format!("`{cleaned}`"))
}

fn entity_create_cypher<'a>(domain_labels: impl IntoIterator<Item = &'a str>, with_embedding: bool) -> String {
    let mut label_clause = String::from(ENTITY_LABEL);
    for label in domain_labels {
        if let Some(safe) = sanitize_label(label) {
            if !label_clause.split(':').any(|existing| existing == safe) {
                label_clause.push(':');
                label_clause.push_str(&safe);
            }
        }
    }

    let mut cypher = format!(
        "CREATE (n:{label_clause} {{
            uuid: $uuid, name: $name, group_id: $group_id, summary: $summary,
            labels: $labels, attributes: $attributes, created_at: $created_at
         }})"
    );
    if with_embedding {
        cypher.push_str("\nSET n.name_embedding = $name_embedding");
    }
    cypher
}

fn row_uuid(row: &Row, key: &str) -> Option<Uuid> {
    row.get::<String>(key).ok().and_then(|s| Uuid::parse_str(&s).ok())
}

fn node_hit_from_row(row: &Row) -> Option<SearchHit> {
    let Some(uuid) = row_uuid(row, "uuid") else {
        warn!("skipping node result without a valid uuid");
        return None;
    };
    Some(SearchHit::Node(NodeHit {
        uuid,
        name: row.get::<String>("name").ok(),
        labels: row.get::<Vec<String>>("labels").ok(),
        summary: row.get::<String>("summary").ok().filter(|s| !s.is_empty()),
        attributes: row
            .get::<String>("attributes")
            .ok()
            .and_then(|s| serde_json::from_str::<Value>(&s).ok()),
        score: row.get::<f64>("score").ok(),
    }))
}

fn edge_hit_from_row(row: &Row) -> Option<SearchHit> {
    let Some(uuid) = row_uuid(row, "uuid") else {
        warn!("skipping relationship result without a valid uuid");
        return None;
    };
    let timestamp = |key: &str| {
        row.get::<String>(key)
            .ok()
            .and_then(|s| parse_flexible_datetime(&s))
    };
    Some(SearchHit::Edge(EdgeHit {
        uuid,
        source_node_uuid: row_uuid(row, "source"),
        target_node_uuid: row_uuid(row, "target"),
        name: row.get::<String>("name").ok(),
        fact: row.get::<String>("fact").ok(),
        valid_at: timestamp("valid_at"),
        invalid_at: timestamp("invalid_at"),
        score: row.get::<f64>("score").ok(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_sanitized_for_cypher() {
        assert_eq!(sanitize_label("Tool").as_deref(), Some("`Tool`"));
        assert_eq!(sanitize_label("Cutting Tool").as_deref(), Some("`CuttingTool`"));
        assert_eq!(sanitize_label("x`) DETACH DELETE n //").as_deref(), Some("`xDETACHDELETEn`"));
        assert_eq!(sanitize_label("--"), None);
    }

    #[test]
    fn entity_create_includes_entity_and_domain_labels() {
        let cypher = entity_create_cypher(["Tool", "Tool", "!!"], false);
        assert!(cypher.starts_with("CREATE (n:Entity:`Tool` {"));
        assert!(!cypher.contains("name_embedding"));
    }

    #[test]
    fn entity_create_sets_embedding_when_present() {
        let no_labels: [&str; 0] = [];
        let cypher = entity_create_cypher(no_labels, true);
        assert!(cypher.starts_with("CREATE (n:Entity {"));
        assert!(cypher.ends_with("SET n.name_embedding = $name_embedding"));
    }

    #[test]
    fn candidate_limit_overfetches() {
        assert_eq!(candidate_limit(10), 20);
        assert_eq!(candidate_limit(0), 2);
    }
}
