//! Sybil cluster detector (§4.11). Runs after the reputation engine has
//! persisted scores for a scope.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use forum_core::{ClusterStatus, GLOBAL_SCOPE, MemberRole};
use forum_db::cluster_ops::{ClusterDetection, ClusterUpsertOutcome};
use forum_db::{DbResult, edge_ops};
use sha2::{Digest as _, Sha256};
use time::OffsetDateTime;

const LOW_TRUST_THRESHOLD: f64 = 0.05;
const MIN_COMPONENT_SIZE: usize = 3;
const INTERNAL_RATIO_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, Default)]
pub struct SybilDetectionSummary {
    pub clusters_detected: usize,
    pub total_low_trust_ids: usize,
    pub duration_ms: u128,
}

/// §4.11 step 5a: a stable identity for a member set, independent of
/// discovery order.
pub fn cluster_hash(members: &[String]) -> String {
    let mut sorted = members.to_vec();
    sorted.sort();
    let joined = sorted.join(",");
    let digest = Sha256::digest(joined.as_bytes());
    format!("{digest:x}")
}

pub async fn detect_for_scope(
    db: &forum_db::Database,
    scope: &str,
    now: OffsetDateTime,
) -> DbResult<SybilDetectionSummary> {
    let started = Instant::now();

    // Step 1: low-trust set, scored either in this scope or the global one.
    let mut low_trust: HashSet<String> = HashSet::new();
    for candidate_scope in [scope, GLOBAL_SCOPE] {
        for row in db.load_all_scores(candidate_scope).await? {
            if row.score < LOW_TRUST_THRESHOLD {
                low_trust.insert(row.repo_id);
            }
        }
    }

    let directed_edges = edge_ops::load_directed_edges(db.pool(), scope).await?;

    // Step 2: undirected adjacency restricted to low-trust members.
    let mut adjacency: HashMap<&str, HashSet<&str>> = HashMap::new();
    for edge in &directed_edges {
        if low_trust.contains(&edge.source_repo_id) && low_trust.contains(&edge.target_repo_id) {
            adjacency
                .entry(edge.source_repo_id.as_str())
                .or_default()
                .insert(edge.target_repo_id.as_str());
            adjacency
                .entry(edge.target_repo_id.as_str())
                .or_default()
                .insert(edge.source_repo_id.as_str());
        }
    }

    // Step 3: connected components via BFS, discard components < 3.
    let mut visited: HashSet<&str> = HashSet::new();
    let mut components: Vec<Vec<&str>> = Vec::new();
    for &start in adjacency.keys() {
        if visited.contains(start) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited.insert(start);
        while let Some(node) = queue.pop_front() {
            component.push(node);
            if let Some(neighbors) = adjacency.get(node) {
                for &neighbor in neighbors {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        if component.len() >= MIN_COMPONENT_SIZE {
            components.push(component);
        }
    }

    let mut clusters_detected = 0;
    for component in &components {
        let member_set: HashSet<&str> = component.iter().copied().collect();

        let mut internal_edges = 0i64;
        let mut external_edges = 0i64;
        let mut internal_degree: HashMap<&str, i64> = HashMap::new();
        for edge in &directed_edges {
            let source_in = member_set.contains(edge.source_repo_id.as_str());
            let target_in = member_set.contains(edge.target_repo_id.as_str());
            if source_in && target_in {
                internal_edges += 1;
                *internal_degree.entry(edge.source_repo_id.as_str()).or_insert(0) += 1;
                *internal_degree.entry(edge.target_repo_id.as_str()).or_insert(0) += 1;
            } else if source_in {
                external_edges += 1;
            }
        }

        let ratio = if internal_edges + external_edges == 0 {
            0.0
        } else {
            internal_edges as f64 / (internal_edges + external_edges) as f64
        };
        if ratio <= INTERNAL_RATIO_THRESHOLD {
            continue;
        }

        let mut degrees: Vec<i64> = component
            .iter()
            .map(|m| *internal_degree.get(m).unwrap_or(&0))
            .collect();
        degrees.sort();
        let median = degrees[degrees.len() / 2];

        let members: Vec<(String, MemberRole)> = component
            .iter()
            .map(|&m| {
                let degree = *internal_degree.get(m).unwrap_or(&0);
                let role = if degree > median {
                    MemberRole::Core
                } else {
                    MemberRole::Peripheral
                };
                (m.to_string(), role)
            })
            .collect();

        let member_ids: Vec<String> = members.iter().map(|(id, _)| id.clone()).collect();
        let hash = cluster_hash(&member_ids);

        let outcome = db
            .upsert_cluster_detection(&ClusterDetection {
                cluster_hash: &hash,
                scope,
                internal_edges,
                external_edges,
                members: &members,
                detected_at: now,
            })
            .await?;
        if outcome == ClusterUpsertOutcome::Flagged {
            clusters_detected += 1;
        }
    }

    Ok(SybilDetectionSummary {
        clusters_detected,
        total_low_trust_ids: low_trust.len(),
        duration_ms: started.elapsed().as_millis(),
    })
}

/// Allow an operator/moderator to dismiss a cluster, which protects it from
/// ever being auto-flagged again (§4.11 step 5b).
pub async fn dismiss_cluster(
    db: &forum_db::Database,
    cluster_hash: &str,
    now: OffsetDateTime,
) -> DbResult<()> {
    db.set_cluster_status(cluster_hash, ClusterStatus::Dismissed, now).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_hash_is_order_independent() {
        let a = cluster_hash(&["b".to_string(), "a".to_string(), "c".to_string()]);
        let b = cluster_hash(&["c".to_string(), "b".to_string(), "a".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn cluster_hash_differs_on_different_membership() {
        let a = cluster_hash(&["a".to_string(), "b".to_string()]);
        let b = cluster_hash(&["a".to_string(), "c".to_string()]);
        assert_ne!(a, b);
    }
}
