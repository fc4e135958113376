//! Read-only aggregate queries backing the behavioral heuristics in
//! `forum-reputation` (§4.12). Kept separate from the write-path `*_ops`
//! modules since nothing here participates in an indexer transaction.

use time::OffsetDateTime;

use crate::{DbResult, Database};

pub struct ContentSample {
    pub uri: String,
    pub author_repo_id: String,
    pub content: String,
}

impl Database {
    /// Distinct non-empty community ids seen across topics and replies, used
    /// to drive the per-scope reputation job (§5 "Reputation job").
    pub async fn list_community_ids(&self) -> DbResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT community_id FROM topics WHERE community_id <> ''
             UNION
             SELECT DISTINCT community_id FROM replies WHERE community_id <> ''",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Per-author reaction counts since `since` (burst voting, §4.12).
    pub async fn reaction_counts_since(&self, since: OffsetDateTime) -> DbResult<Vec<(String, i64)>> {
        let rows = sqlx::query_as(
            "SELECT author_repo_id, COUNT(*) FROM reactions WHERE created_at >= $1
             GROUP BY author_repo_id",
        )
        .bind(since)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Per-author (total reaction count, distinct subject count) overall
    /// (low diversity, §4.12 — no time window given for this one).
    pub async fn reaction_diversity(&self) -> DbResult<Vec<(String, i64, i64)>> {
        let rows = sqlx::query_as(
            "SELECT author_repo_id, COUNT(*), COUNT(DISTINCT subject_uri)
             FROM reactions GROUP BY author_repo_id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Topic and reply bodies created since `since` (content similarity,
    /// §4.12), used as input to the trigram/Jaccard comparison.
    pub async fn content_samples_since(&self, since: OffsetDateTime) -> DbResult<Vec<ContentSample>> {
        let topics: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT uri, author_repo_id, content FROM topics WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_all(self.pool())
        .await?;
        let replies: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT uri, author_repo_id, content FROM replies WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_all(self.pool())
        .await?;

        Ok(topics
            .into_iter()
            .chain(replies)
            .map(|(uri, author_repo_id, content)| ContentSample {
                uri,
                author_repo_id,
                content,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use forum_core::TrustStatus;
    use time::macros::datetime;

    use super::*;
    use crate::reaction_ops::{NewReaction, ReactionCreateOutcome};
    use crate::topic_ops::NewTopic;

    #[sqlx::test]
    async fn reaction_counts_since_only_counts_recent_window(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let old = datetime!(2026-07-29 12:00 UTC);
        let recent = datetime!(2026-07-30 12:00 UTC);
        db.insert_user_stub("author", None, old).await.unwrap();
        db.insert_user_stub("reactor", None, old).await.unwrap();
        db.create_topic(&NewTopic {
            uri: "at://author/forum.x.topic.post/1",
            record_key: "1",
            author_repo_id: "author",
            title: "t",
            content: "c",
            category: "general",
            tags: &[],
            community_id: "",
            cid: "bafy0",
            self_labels: &[],
            created_at: old,
            trust_status: TrustStatus::Trusted,
        })
        .await
        .unwrap();

        let outcome = db
            .create_reaction(&NewReaction {
                uri: "at://reactor/forum.x.interaction.reaction/1",
                author_repo_id: "reactor",
                subject_uri: "at://author/forum.x.topic.post/1",
                subject_cid: "bafy0",
                reaction_type: "like",
                community_id: "",
                created_at: recent,
            })
            .await
            .unwrap();
        assert_eq!(outcome, ReactionCreateOutcome::Inserted);

        let since_cutoff = datetime!(2026-07-30 00:00 UTC);
        let counts = db.reaction_counts_since(since_cutoff).await.unwrap();
        assert_eq!(counts, vec![("reactor".to_string(), 1)]);

        let since_too_late = datetime!(2026-07-31 00:00 UTC);
        assert!(db.reaction_counts_since(since_too_late).await.unwrap().is_empty());
    }
}
