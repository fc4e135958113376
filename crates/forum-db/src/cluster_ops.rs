//! Sybil cluster persistence (§4.11 "Sybil cluster detector").
//!
//! The detector itself (connected components, internal-edge-ratio, cluster
//! hashing) lives in `forum-reputation`; this module only owns the storage
//! half — looking clusters up by their stable hash, upserting detection
//! results, and replacing the member set, honoring the rule that a
//! dismissed cluster is never re-flagged automatically.

use time::OffsetDateTime;

use crate::models::{SybilClusterMemberRow, SybilClusterRow};
use crate::{DbResult, Database};
use forum_core::{ClusterStatus, MemberRole};

pub struct ClusterDetection<'a> {
    pub cluster_hash: &'a str,
    pub scope: &'a str,
    pub internal_edges: i64,
    pub external_edges: i64,
    pub members: &'a [(String, MemberRole)],
    pub detected_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterUpsertOutcome {
    /// New cluster flagged, or an existing non-dismissed cluster refreshed.
    Flagged,
    /// A previously `dismissed` cluster is never re-flagged automatically
    /// (§4.11: "a dismissed cluster must not be re-flagged by a later run
    /// with the same membership"); the stored row is left untouched.
    SkippedDismissed,
}

impl Database {
    pub async fn get_cluster(&self, cluster_hash: &str) -> DbResult<Option<SybilClusterRow>> {
        let row = sqlx::query_as::<_, SybilClusterRow>(
            "SELECT * FROM sybil_clusters WHERE cluster_hash = $1",
        )
        .bind(cluster_hash)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_cluster_members(
        &self,
        cluster_hash: &str,
    ) -> DbResult<Vec<SybilClusterMemberRow>> {
        let rows = sqlx::query_as::<_, SybilClusterMemberRow>(
            "SELECT * FROM sybil_cluster_members WHERE cluster_hash = $1",
        )
        .bind(cluster_hash)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Insert or refresh a detected cluster and fully replace its member
    /// set, unless the stored cluster is already `dismissed`.
    pub async fn upsert_cluster_detection(
        &self,
        detection: &ClusterDetection<'_>,
    ) -> DbResult<ClusterUpsertOutcome> {
        let mut tx = self.pool().begin().await?;

        let existing_status: Option<(ClusterStatus,)> =
            sqlx::query_as("SELECT status FROM sybil_clusters WHERE cluster_hash = $1")
                .bind(detection.cluster_hash)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some((ClusterStatus::Dismissed,)) = existing_status {
            tx.commit().await?;
            return Ok(ClusterUpsertOutcome::SkippedDismissed);
        }

        sqlx::query(
            "INSERT INTO sybil_clusters
                (cluster_hash, scope, internal_edges, external_edges, member_count,
                 status, detected_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, 'flagged', $6, $6)
             ON CONFLICT (cluster_hash) DO UPDATE SET
                internal_edges = EXCLUDED.internal_edges,
                external_edges = EXCLUDED.external_edges,
                member_count = EXCLUDED.member_count,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(detection.cluster_hash)
        .bind(detection.scope)
        .bind(detection.internal_edges)
        .bind(detection.external_edges)
        .bind(detection.members.len() as i32)
        .bind(detection.detected_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM sybil_cluster_members WHERE cluster_hash = $1")
            .bind(detection.cluster_hash)
            .execute(&mut *tx)
            .await?;

        for (repo_id, role) in detection.members {
            sqlx::query(
                "INSERT INTO sybil_cluster_members (cluster_hash, repo_id, role) VALUES ($1, $2, $3)",
            )
            .bind(detection.cluster_hash)
            .bind(repo_id)
            .bind(role)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(ClusterUpsertOutcome::Flagged)
    }

    pub async fn set_cluster_status(
        &self,
        cluster_hash: &str,
        status: ClusterStatus,
        now: OffsetDateTime,
    ) -> DbResult<()> {
        sqlx::query("UPDATE sybil_clusters SET status = $2, updated_at = $3 WHERE cluster_hash = $1")
            .bind(cluster_hash)
            .bind(status)
            .bind(now)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn list_clusters_for_scope(&self, scope: &str) -> DbResult<Vec<SybilClusterRow>> {
        let rows = sqlx::query_as::<_, SybilClusterRow>(
            "SELECT * FROM sybil_clusters WHERE scope = $1",
        )
        .bind(scope)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn sample(hash: &str, now: OffsetDateTime) -> ClusterDetection<'_> {
        ClusterDetection {
            cluster_hash: hash,
            scope: "",
            internal_edges: 9,
            external_edges: 1,
            members: &[],
            detected_at: now,
        }
    }

    #[sqlx::test]
    async fn upsert_then_lookup_round_trips(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        let detection = sample("hash1", now);
        let outcome = db.upsert_cluster_detection(&detection).await.unwrap();
        assert_eq!(outcome, ClusterUpsertOutcome::Flagged);

        let cluster = db.get_cluster("hash1").await.unwrap().unwrap();
        assert_eq!(cluster.status, ClusterStatus::Flagged);
        assert_eq!(cluster.internal_edges, 9);
    }

    #[sqlx::test]
    async fn dismissed_cluster_is_never_reflagged(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        db.upsert_cluster_detection(&sample("hash1", now)).await.unwrap();
        db.set_cluster_status("hash1", ClusterStatus::Dismissed, now)
            .await
            .unwrap();

        let later = now + time::Duration::hours(1);
        let outcome = db
            .upsert_cluster_detection(&ClusterDetection {
                internal_edges: 20,
                detected_at: later,
                ..sample("hash1", later)
            })
            .await
            .unwrap();
        assert_eq!(outcome, ClusterUpsertOutcome::SkippedDismissed);

        let cluster = db.get_cluster("hash1").await.unwrap().unwrap();
        assert_eq!(cluster.status, ClusterStatus::Dismissed);
        assert_eq!(cluster.internal_edges, 9, "dismissed clusters are not overwritten");
    }

    #[sqlx::test]
    async fn member_set_is_fully_replaced_on_refresh(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        db.upsert_cluster_detection(&ClusterDetection {
            members: &[("a".into(), MemberRole::Core), ("b".into(), MemberRole::Peripheral)],
            ..sample("hash1", now)
        })
        .await
        .unwrap();

        db.upsert_cluster_detection(&ClusterDetection {
            members: &[("a".into(), MemberRole::Core), ("c".into(), MemberRole::Peripheral)],
            detected_at: now + time::Duration::hours(1),
            ..sample("hash1", now)
        })
        .await
        .unwrap();

        let mut members: Vec<String> = db
            .list_cluster_members("hash1")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.repo_id)
            .collect();
        members.sort();
        assert_eq!(members, vec!["a", "c"]);
    }
}
