//! Rank fusion and reranking shared by the drivers.

use std::collections::HashMap;

use uuid::Uuid;

use super::SearchHit;

/// Smoothing constant for reciprocal-rank fusion.
pub const RRF_K: f64 = 60.0;

/// Reciprocal-rank fusion of ranked id lists, best first.
///
/// Each appearance at zero-based rank `r` contributes `1 / (RRF_K + r + 1)`.
/// Equal scores keep first-seen order.
pub fn rrf(rankings: &[Vec<Uuid>]) -> Vec<(Uuid, f64)> {
    let mut scores: HashMap<Uuid, f64> = HashMap::new();
    let mut order: Vec<Uuid> = Vec::new();

    for ranking in rankings {
        for (rank, id) in ranking.iter().enumerate() {
            let score = scores.entry(*id).or_insert_with(|| {
                order.push(*id);
                0.0
            });
            *score += 1.0 / (RRF_K + rank as f64 + 1.0);
        }
    }

    let mut fused: Vec<(Uuid, f64)> = order
        .into_iter()
        .map(|id| (id, scores.get(&id).copied().unwrap_or_default()))
        .collect();
    fused.sort_by(|a, b| b.1.total_cmp(&a.1));
    fused
}

/// Fuse several ranked hit lists into one, scoring each hit with its RRF score.
pub fn fuse(rankings: Vec<Vec<SearchHit>>) -> Vec<SearchHit> {
    let ids: Vec<Vec<Uuid>> = rankings
        .iter()
        .map(|ranking| ranking.iter().map(SearchHit::uuid).collect())
        .collect();

    let mut by_id: HashMap<Uuid, SearchHit> = HashMap::new();
    for hit in rankings.into_iter().flatten() {
        by_id.entry(hit.uuid()).or_insert(hit);
    }

    rrf(&ids)
        .into_iter()
        .filter_map(|(id, score)| {
            let mut hit = by_id.remove(&id)?;
            hit.set_score(score);
            Some(hit)
        })
        .collect()
}

/// Reorder hits by hop distance from a center node, nearest first.
///
/// An edge is as close as its nearer endpoint. Hits with no known distance go
/// last; ties keep their fused order.
pub fn rerank_by_distance(mut hits: Vec<SearchHit>, distances: &HashMap<Uuid, usize>) -> Vec<SearchHit> {
    let distance_of = |hit: &SearchHit| -> usize {
        let distance = match hit {
            SearchHit::Node(n) => distances.get(&n.uuid).copied(),
            SearchHit::Edge(e) => [e.source_node_uuid, e.target_node_uuid]
                .into_iter()
                .flatten()
                .filter_map(|id| distances.get(&id).copied())
                .min(),
        };
        distance.unwrap_or(usize::MAX)
    };
    hits.sort_by_key(distance_of);
    hits
}
