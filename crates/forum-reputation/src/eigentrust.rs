//! EigenTrust reputation engine (§4.10).
//!
//! The algorithm itself is a pure function over plain `HashMap`/`BTreeMap`
//! adjacency, following the web-of-trust code in
//! `rostra-client-db/src/social.rs`, which reaches for maps rather than a
//! graph crate. `run_for_scope` is the thin I/O shell around it.

use std::collections::{HashMap, HashSet};

use time::OffsetDateTime;

const MAX_ITERATIONS: u32 = 20;
const DAMPING: f64 = 0.5;
const CONVERGENCE_THRESHOLD: f64 = 1e-3;

#[derive(Debug, Clone)]
pub struct EigenTrustResult {
    pub scores: HashMap<String, f64>,
    pub converged: bool,
    pub iterations: u32,
}

/// Pure EigenTrust iteration (§4.10 steps 1–5). `edges` must already be
/// collapsed to one weight per (source, target) — callers load that via
/// `forum_db::edge_ops::load_collapsed_edges`.
pub fn run_eigentrust(edges: &[(String, String, i64)], seeds: &HashSet<String>) -> EigenTrustResult {
    let mut nodes: HashSet<&str> = HashSet::new();
    for (source, target, _) in edges {
        nodes.insert(source);
        nodes.insert(target);
    }

    if seeds.is_empty() {
        return EigenTrustResult {
            scores: nodes.into_iter().map(|v| (v.to_string(), 0.0)).collect(),
            converged: true,
            iterations: 0,
        };
    }

    let seed_value = |v: &str| -> f64 {
        if seeds.contains(v) { 1.0 } else { 0.0 }
    };

    let mut outgoing_total: HashMap<&str, i64> = HashMap::new();
    for (source, _, weight) in edges {
        *outgoing_total.entry(source.as_str()).or_insert(0) += weight;
    }

    // Incoming adjacency: for each target, the (source, weight) pairs
    // feeding into it.
    let mut incoming: HashMap<&str, Vec<(&str, i64)>> = HashMap::new();
    for (source, target, weight) in edges {
        incoming
            .entry(target.as_str())
            .or_default()
            .push((source.as_str(), *weight));
    }

    let mut t: HashMap<&str, f64> = nodes.iter().map(|&v| (v, seed_value(v))).collect();

    let mut converged = false;
    let mut iterations = 0;
    for _ in 0..MAX_ITERATIONS {
        iterations += 1;
        let mut next: HashMap<&str, f64> = HashMap::with_capacity(t.len());
        let mut max_delta: f64 = 0.0;
        for &v in &nodes {
            let propagated: f64 = incoming
                .get(v)
                .map(|sources| {
                    sources
                        .iter()
                        .map(|(u, w)| {
                            let o_u = *outgoing_total.get(u).unwrap_or(&0) as f64;
                            if o_u == 0.0 {
                                0.0
                            } else {
                                t.get(u).copied().unwrap_or(0.0) * (*w as f64) / o_u
                            }
                        })
                        .sum()
                })
                .unwrap_or(0.0);
            let value = DAMPING * seed_value(v) + DAMPING * propagated;
            let delta = (value - t.get(v).copied().unwrap_or(0.0)).abs();
            if delta > max_delta {
                max_delta = delta;
            }
            next.insert(v, value);
        }
        t = next;
        if max_delta < CONVERGENCE_THRESHOLD {
            converged = true;
            break;
        }
    }

    EigenTrustResult {
        scores: t.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        converged,
        iterations,
    }
}

/// Run the engine for a scope and persist every resulting score (§4.10
/// step 6).
pub async fn run_for_scope(
    db: &forum_db::Database,
    scope: &str,
    now: OffsetDateTime,
) -> forum_db::DbResult<EigenTrustResult> {
    let edges = forum_db::edge_ops::load_collapsed_edges(db.pool(), scope).await?;
    let seeds: HashSet<String> = db.load_seed_set(scope).await?.into_iter().collect();

    let result = run_eigentrust(&edges, &seeds);

    for (repo_id, score) in &result.scores {
        db.upsert_trust_score(repo_id, scope, *score, now).await?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_seed_set_returns_all_zeros_converged() {
        let edges = vec![("a".to_string(), "b".to_string(), 5)];
        let result = run_eigentrust(&edges, &HashSet::new());
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.scores.get("a"), Some(&0.0));
        assert_eq!(result.scores.get("b"), Some(&0.0));
    }

    #[test]
    fn seed_node_with_no_incoming_edges_settles_at_damped_value() {
        // a is a seed with one outgoing edge to b and nothing pointing back
        // in: a's score should settle at damping * 1.0 since it has no
        // incoming propagation term.
        let edges = vec![("a".to_string(), "b".to_string(), 1)];
        let seeds: HashSet<String> = ["a".to_string()].into_iter().collect();
        let result = run_eigentrust(&edges, &seeds);
        assert!(result.converged);
        assert!((result.scores["a"] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn trust_propagates_along_edges_from_seed() {
        let edges = vec![("seed".to_string(), "follower".to_string(), 10)];
        let seeds: HashSet<String> = ["seed".to_string()].into_iter().collect();
        let result = run_eigentrust(&edges, &seeds);
        assert!(result.converged);
        // follower gets 0.5 * (seed_score * 10 / 10) = 0.5 * seed_score.
        let seed_score = result.scores["seed"];
        assert!((result.scores["follower"] - 0.5 * seed_score).abs() < 1e-6);
    }

    #[test]
    fn disconnected_non_seed_nodes_settle_at_zero() {
        let edges = vec![
            ("seed".to_string(), "a".to_string(), 1),
            ("x".to_string(), "y".to_string(), 1),
        ];
        let seeds: HashSet<String> = ["seed".to_string()].into_iter().collect();
        let result = run_eigentrust(&edges, &seeds);
        assert!((result.scores["x"]).abs() < 1e-6);
        assert!((result.scores["y"]).abs() < 1e-6);
    }
}
