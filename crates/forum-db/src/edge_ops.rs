//! Interaction edges (§3 "Interaction edge"): the directed, weighted graph
//! the reputation engine consumes. Indexers call `upsert_edge` as a side
//! effect of recording a reply/reaction/topic-coparticipation so the graph
//! stays in lockstep with the primary rows, inside the same transaction.

use forum_core::InteractionKind;
use time::OffsetDateTime;

use crate::DbResult;
use crate::models::InteractionEdgeRow;

/// Increment the weight of the (source, target, community, kind) edge,
/// creating it with weight 1 if absent (§3 uniqueness on the 4-tuple).
/// A self-edge (source == target) is skipped: it cannot contribute to
/// either EigenTrust propagation or sybil-cluster detection.
pub async fn upsert_edge(
    tx: &mut sqlx::PgConnection,
    source_repo_id: &str,
    target_repo_id: &str,
    community_id: &str,
    kind: InteractionKind,
    now: OffsetDateTime,
) -> DbResult<()> {
    if source_repo_id == target_repo_id {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO interaction_edges
            (source_repo_id, target_repo_id, community_id, kind, weight, first_seen_at, last_seen_at)
         VALUES ($1, $2, $3, $4, 1, $5, $5)
         ON CONFLICT (source_repo_id, target_repo_id, community_id, kind)
         DO UPDATE SET weight = interaction_edges.weight + 1, last_seen_at = EXCLUDED.last_seen_at",
    )
    .bind(source_repo_id)
    .bind(target_repo_id)
    .bind(community_id)
    .bind(kind)
    .bind(now)
    .execute(tx)
    .await?;
    Ok(())
}

/// All edges for a scope, collapsing `kind` by summation per (source,
/// target) as required by the EigenTrust input contract (§4.10 step "Kinds
/// collapse by summation into a single weight per (source, target)").
pub async fn load_collapsed_edges(
    pool: &sqlx::PgPool,
    scope: &str,
) -> DbResult<Vec<(String, String, i64)>> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT source_repo_id, target_repo_id, SUM(weight)::BIGINT
         FROM interaction_edges
         WHERE community_id = $1
         GROUP BY source_repo_id, target_repo_id",
    )
    .bind(scope)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All directed edges for a scope, kept separate by kind (used by the sybil
/// detector's internal/external edge count, which operates on the raw
/// directed edge set rather than the collapsed undirected view).
pub async fn load_directed_edges(
    pool: &sqlx::PgPool,
    scope: &str,
) -> DbResult<Vec<InteractionEdgeRow>> {
    let rows = sqlx::query_as::<_, InteractionEdgeRow>(
        "SELECT source_repo_id, target_repo_id, community_id, kind, weight, first_seen_at, last_seen_at
         FROM interaction_edges WHERE community_id = $1",
    )
    .bind(scope)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
