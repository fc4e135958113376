//! Behavioral heuristics (§4.12): burst voting, content similarity, low
//! reaction diversity. Independent detectors — a failure in one must not
//! block the others, so the job driver runs each and logs rather than
//! propagating the first error.

use std::collections::{HashMap, HashSet};

use forum_db::{DbResult, analytics_ops::ContentSample};
use serde_json::json;
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation as _;

const BURST_VOTE_WINDOW_MINS: i64 = 10;
const BURST_VOTE_THRESHOLD: i64 = 20;
const SIMILARITY_WINDOW_HOURS: i64 = 24;
const JACCARD_THRESHOLD: f64 = 0.8;
const MIN_SIMILARITY_CLUSTER_AUTHORS: usize = 3;
const LOW_DIVERSITY_COUNT_THRESHOLD: i64 = 10;
const LOW_DIVERSITY_SUBJECT_THRESHOLD: i64 = 3;

pub async fn detect_burst_voting(db: &forum_db::Database, now: OffsetDateTime) -> DbResult<usize> {
    let since = now - time::Duration::minutes(BURST_VOTE_WINDOW_MINS);
    let counts = db.reaction_counts_since(since).await?;
    let mut flagged = 0;
    for (author, count) in counts {
        if count > BURST_VOTE_THRESHOLD {
            db.insert_behavioral_flag(
                "burst_voting",
                &[author],
                &json!({"window_mins": BURST_VOTE_WINDOW_MINS, "count": count}),
                now,
            )
            .await?;
            flagged += 1;
        }
    }
    Ok(flagged)
}

pub async fn detect_low_diversity(db: &forum_db::Database, now: OffsetDateTime) -> DbResult<usize> {
    let rows = db.reaction_diversity().await?;
    let mut flagged = 0;
    for (author, total, distinct_subjects) in rows {
        if total > LOW_DIVERSITY_COUNT_THRESHOLD && distinct_subjects < LOW_DIVERSITY_SUBJECT_THRESHOLD {
            db.insert_behavioral_flag(
                "low_diversity",
                &[author],
                &json!({"total_reactions": total, "distinct_subjects": distinct_subjects}),
                now,
            )
            .await?;
            flagged += 1;
        }
    }
    Ok(flagged)
}

/// Lowercase, strip non-alphanumeric, collapse whitespace, then take the
/// set of character trigrams (§4.12 "normalized trigram sets").
fn trigram_set(content: &str) -> HashSet<String> {
    let normalized: String = content
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<&str> = collapsed.graphemes(true).collect();
    if chars.len() < 3 {
        return HashSet::from([collapsed]);
    }
    chars
        .windows(3)
        .map(|w| w.concat())
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 { 0.0 } else { intersection / union }
}

pub async fn detect_content_similarity(
    db: &forum_db::Database,
    now: OffsetDateTime,
) -> DbResult<usize> {
    let since = now - time::Duration::hours(SIMILARITY_WINDOW_HOURS);
    let samples = db.content_samples_since(since).await?;

    let trigrams: Vec<(&ContentSample, HashSet<String>)> =
        samples.iter().map(|s| (s, trigram_set(&s.content))).collect();

    // Union-find over author ids: any similar pair from different authors
    // merges both authors into the same cluster, keyed for reporting
    // purposes by the lexicographically smallest member URI observed.
    let mut cluster_of: HashMap<&str, usize> = HashMap::new();
    let mut clusters: Vec<HashSet<&str>> = Vec::new();
    let mut cluster_keys: Vec<&str> = Vec::new();

    for i in 0..trigrams.len() {
        for j in (i + 1)..trigrams.len() {
            let (sample_a, set_a) = &trigrams[i];
            let (sample_b, set_b) = &trigrams[j];
            if sample_a.author_repo_id == sample_b.author_repo_id {
                continue;
            }
            if jaccard(set_a, set_b) < JACCARD_THRESHOLD {
                continue;
            }

            let key_uri = if sample_a.uri < sample_b.uri {
                sample_a.uri.as_str()
            } else {
                sample_b.uri.as_str()
            };

            let idx_a = cluster_of.get(sample_a.author_repo_id.as_str()).copied();
            let idx_b = cluster_of.get(sample_b.author_repo_id.as_str()).copied();

            match (idx_a, idx_b) {
                (None, None) => {
                    let idx = clusters.len();
                    let mut set = HashSet::new();
                    set.insert(sample_a.author_repo_id.as_str());
                    set.insert(sample_b.author_repo_id.as_str());
                    clusters.push(set);
                    cluster_keys.push(key_uri);
                    cluster_of.insert(sample_a.author_repo_id.as_str(), idx);
                    cluster_of.insert(sample_b.author_repo_id.as_str(), idx);
                }
                (Some(idx), None) => {
                    clusters[idx].insert(sample_b.author_repo_id.as_str());
                    cluster_of.insert(sample_b.author_repo_id.as_str(), idx);
                }
                (None, Some(idx)) => {
                    clusters[idx].insert(sample_a.author_repo_id.as_str());
                    cluster_of.insert(sample_a.author_repo_id.as_str(), idx);
                }
                (Some(idx_a), Some(idx_b)) if idx_a != idx_b => {
                    let (keep, drop) = (idx_a.min(idx_b), idx_a.max(idx_b));
                    let moved: Vec<&str> = clusters[drop].iter().copied().collect();
                    for author in moved {
                        clusters[keep].insert(author);
                        cluster_of.insert(author, keep);
                    }
                    clusters[drop].clear();
                }
                _ => {}
            }
        }
    }

    let mut flagged = 0;
    for (idx, cluster) in clusters.iter().enumerate() {
        if cluster.len() < MIN_SIMILARITY_CLUSTER_AUTHORS {
            continue;
        }
        let affected: Vec<String> = cluster.iter().map(|a| a.to_string()).collect();
        db.insert_behavioral_flag(
            "content_similarity",
            &affected,
            &json!({"cluster_key_uri": cluster_keys[idx], "author_count": cluster.len()}),
            now,
        )
        .await?;
        flagged += 1;
    }

    Ok(flagged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_has_jaccard_one() {
        let a = trigram_set("Hello World");
        let b = trigram_set("hello   world!!!");
        assert_eq!(jaccard(&a, &b), 1.0);
    }

    #[test]
    fn unrelated_content_has_low_jaccard() {
        let a = trigram_set("the quick brown fox");
        let b = trigram_set("zzyzx qqplm wvutsr");
        assert!(jaccard(&a, &b) < JACCARD_THRESHOLD);
    }
}
