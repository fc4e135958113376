//! Reply indexer (§4.3 "Reply indexer").
//!
//! Resolves the reply-delete root-URI lookup the way SPEC_FULL.md's "Open
//! Questions — resolved" section decided: option (b), looking the root URI
//! up from the stored reply row rather than relying on the (often empty)
//! delete event body. This means firehose-driven deletes *do* decrement the
//! root's `reply_count`, unlike the flagged source behavior in spec.md §9.

use forum_core::{InteractionKind, TrustStatus};
use time::OffsetDateTime;

use crate::edge_ops;
use crate::models::ReplyRow;
use crate::sanitize::normalize_and_sanitize_content;
use crate::{DbResult, Database};

pub struct NewReply<'a> {
    pub uri: &'a str,
    pub record_key: &'a str,
    pub author_repo_id: &'a str,
    pub content: &'a str,
    pub root_uri: &'a str,
    pub root_cid: &'a str,
    pub root_author_repo_id: &'a str,
    pub parent_uri: &'a str,
    pub parent_cid: &'a str,
    pub community_id: &'a str,
    pub created_at: OffsetDateTime,
    pub trust_status: TrustStatus,
}

pub struct ReplyEdit<'a> {
    pub content: &'a str,
    pub cid: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCreateOutcome {
    Inserted,
    AlreadyExists,
}

impl Database {
    pub async fn get_reply(&self, uri: &str) -> DbResult<Option<ReplyRow>> {
        let row = sqlx::query_as::<_, ReplyRow>("SELECT * FROM replies WHERE uri = $1")
            .bind(uri)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    /// Insert a reply and, in the same transaction, increment the root
    /// topic's `reply_count` and bump its `last_activity_at` (§4.3).
    /// Idempotent on duplicate URI.
    pub async fn create_reply(&self, new: &NewReply<'_>) -> DbResult<ReplyCreateOutcome> {
        let content = normalize_and_sanitize_content(new.content);
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            "INSERT INTO replies
                (uri, record_key, author_repo_id, content, root_uri, root_cid,
                 parent_uri, parent_cid, community_id, created_at, trust_status)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
             ON CONFLICT (uri) DO NOTHING",
        )
        .bind(new.uri)
        .bind(new.record_key)
        .bind(new.author_repo_id)
        .bind(&content)
        .bind(new.root_uri)
        .bind(new.root_cid)
        .bind(new.parent_uri)
        .bind(new.parent_cid)
        .bind(new.community_id)
        .bind(new.created_at)
        .bind(new.trust_status)
        .execute(&mut *tx)
        .await?;

        let outcome = if result.rows_affected() == 1 {
            Database::bump_topic_for_new_reply(&mut tx, new.root_uri, new.created_at).await?;
            edge_ops::upsert_edge(
                &mut tx,
                new.author_repo_id,
                new.root_author_repo_id,
                new.community_id,
                InteractionKind::Reply,
                new.created_at,
            )
            .await?;

            // §3 glossary "topic-coparticipation": every other distinct
            // author already present on the thread gets an edge from the
            // new reply's author.
            let prior_replies: Vec<(String,)> = sqlx::query_as(
                "SELECT DISTINCT author_repo_id FROM replies
                 WHERE root_uri = $1 AND author_repo_id <> $2",
            )
            .bind(new.root_uri)
            .bind(new.author_repo_id)
            .fetch_all(&mut *tx)
            .await?;
            let mut participants: std::collections::HashSet<String> =
                prior_replies.into_iter().map(|(p,)| p).collect();
            participants.insert(new.root_author_repo_id.to_string());
            for participant in participants {
                edge_ops::upsert_edge(
                    &mut tx,
                    new.author_repo_id,
                    &participant,
                    new.community_id,
                    InteractionKind::TopicCoparticipation,
                    new.created_at,
                )
                .await?;
            }

            ReplyCreateOutcome::Inserted
        } else {
            ReplyCreateOutcome::AlreadyExists
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Update overwrites content/cid; `root`/`parent` refs never change
    /// (§4.3: "Update overwrites content/labels/cid").
    pub async fn update_reply(
        &self,
        uri: &str,
        edit: &ReplyEdit<'_>,
        now: OffsetDateTime,
    ) -> DbResult<()> {
        let content = normalize_and_sanitize_content(edit.content);
        sqlx::query(
            "UPDATE replies SET content = $2, parent_cid = $3, indexed_at = $4 WHERE uri = $1",
        )
        .bind(uri)
        .bind(&content)
        .bind(edit.cid)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Soft-delete and, if the root is known, decrement its `reply_count`
    /// (§4.3, and the Open Question resolution above).
    pub async fn soft_delete_reply(&self, uri: &str) -> DbResult<()> {
        let mut tx = self.pool().begin().await?;
        let root_uri: Option<(String,)> =
            sqlx::query_as("SELECT root_uri FROM replies WHERE uri = $1 AND author_deleted = false")
                .bind(uri)
                .fetch_optional(&mut *tx)
                .await?;

        sqlx::query("UPDATE replies SET author_deleted = true WHERE uri = $1")
            .bind(uri)
            .execute(&mut *tx)
            .await?;

        if let Some((root_uri,)) = root_uri {
            Database::decrement_topic_reply_count(&mut tx, &root_uri).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn bump_reaction_count_on_reply(
        tx: &mut sqlx::PgConnection,
        reply_uri: &str,
    ) -> DbResult<()> {
        sqlx::query("UPDATE replies SET reaction_count = reaction_count + 1 WHERE uri = $1")
            .bind(reply_uri)
            .execute(tx)
            .await?;
        Ok(())
    }

    pub async fn decrement_reaction_count_on_reply(
        tx: &mut sqlx::PgConnection,
        reply_uri: &str,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE replies SET reaction_count = GREATEST(reaction_count - 1, 0) WHERE uri = $1",
        )
        .bind(reply_uri)
        .execute(tx)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::topic_ops::NewTopic;

    async fn setup_topic(db: &Database, now: OffsetDateTime) -> &'static str {
        db.insert_user_stub("topic-author", None, now).await.unwrap();
        let uri = "at://topic-author/forum.x.topic.post/1";
        db.create_topic(&NewTopic {
            uri,
            record_key: "1",
            author_repo_id: "topic-author",
            title: "t",
            content: "c",
            category: "general",
            tags: &[],
            community_id: "",
            cid: "bafy0",
            self_labels: &[],
            created_at: now,
            trust_status: TrustStatus::Trusted,
        })
        .await
        .unwrap();
        uri
    }

    #[sqlx::test]
    async fn create_increments_root_reply_count(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        let root = setup_topic(&db, now).await;
        db.insert_user_stub("replier", None, now).await.unwrap();

        db.create_reply(&NewReply {
            uri: "at://replier/forum.x.topic.reply/1",
            record_key: "1",
            author_repo_id: "replier",
            content: "hi",
            root_uri: root,
            root_cid: "bafy0",
            root_author_repo_id: "topic-author",
            parent_uri: root,
            parent_cid: "bafy0",
            community_id: "",
            created_at: now,
            trust_status: TrustStatus::Trusted,
        })
        .await
        .unwrap();

        let topic = db.get_topic(root).await.unwrap().unwrap();
        assert_eq!(topic.reply_count, 1);
        assert_eq!(topic.last_activity_at, now);

        let mut edges = crate::edge_ops::load_directed_edges(db.pool(), "").await.unwrap();
        edges.sort_by_key(|e| format!("{:?}", e.kind));
        assert_eq!(edges.len(), 2, "expect a reply edge and a topic-coparticipation edge");
        for edge in &edges {
            assert_eq!(edge.source_repo_id, "replier");
            assert_eq!(edge.target_repo_id, "topic-author");
            assert_eq!(edge.weight, 1);
        }
    }

    #[sqlx::test]
    async fn reply_creates_coparticipation_edges_with_every_prior_replier(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        let root = setup_topic(&db, now).await;
        db.insert_user_stub("first-replier", None, now).await.unwrap();
        db.insert_user_stub("second-replier", None, now).await.unwrap();

        db.create_reply(&NewReply {
            uri: "at://first-replier/forum.x.topic.reply/1",
            record_key: "1",
            author_repo_id: "first-replier",
            content: "hi",
            root_uri: root,
            root_cid: "bafy0",
            root_author_repo_id: "topic-author",
            parent_uri: root,
            parent_cid: "bafy0",
            community_id: "",
            created_at: now,
            trust_status: TrustStatus::Trusted,
        })
        .await
        .unwrap();

        db.create_reply(&NewReply {
            uri: "at://second-replier/forum.x.topic.reply/1",
            record_key: "1",
            author_repo_id: "second-replier",
            content: "hi",
            root_uri: root,
            root_cid: "bafy0",
            root_author_repo_id: "topic-author",
            parent_uri: root,
            parent_cid: "bafy0",
            community_id: "",
            created_at: now,
            trust_status: TrustStatus::Trusted,
        })
        .await
        .unwrap();

        let edges = crate::edge_ops::load_directed_edges(db.pool(), "").await.unwrap();
        let coparticipation: Vec<_> = edges
            .iter()
            .filter(|e| e.kind == InteractionKind::TopicCoparticipation && e.source_repo_id == "second-replier")
            .collect();
        assert_eq!(coparticipation.len(), 2, "second replier co-participates with both topic-author and first-replier");
        let targets: std::collections::HashSet<_> =
            coparticipation.iter().map(|e| e.target_repo_id.as_str()).collect();
        assert!(targets.contains("topic-author"));
        assert!(targets.contains("first-replier"));
    }

    #[sqlx::test]
    async fn duplicate_create_does_not_double_increment(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        let root = setup_topic(&db, now).await;
        db.insert_user_stub("replier", None, now).await.unwrap();

        let new = NewReply {
            uri: "at://replier/forum.x.topic.reply/1",
            record_key: "1",
            author_repo_id: "replier",
            content: "hi",
            root_uri: root,
            root_cid: "bafy0",
            root_author_repo_id: "topic-author",
            parent_uri: root,
            parent_cid: "bafy0",
            community_id: "",
            created_at: now,
            trust_status: TrustStatus::Trusted,
        };
        assert_eq!(db.create_reply(&new).await.unwrap(), ReplyCreateOutcome::Inserted);
        assert_eq!(db.create_reply(&new).await.unwrap(), ReplyCreateOutcome::AlreadyExists);

        let topic = db.get_topic(root).await.unwrap().unwrap();
        assert_eq!(topic.reply_count, 1);
    }

    #[sqlx::test]
    async fn soft_delete_decrements_root_reply_count(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        let root = setup_topic(&db, now).await;
        db.insert_user_stub("replier", None, now).await.unwrap();

        let uri = "at://replier/forum.x.topic.reply/1";
        db.create_reply(&NewReply {
            uri,
            record_key: "1",
            author_repo_id: "replier",
            content: "hi",
            root_uri: root,
            root_cid: "bafy0",
            root_author_repo_id: "topic-author",
            parent_uri: root,
            parent_cid: "bafy0",
            community_id: "",
            created_at: now,
            trust_status: TrustStatus::Trusted,
        })
        .await
        .unwrap();

        db.soft_delete_reply(uri).await.unwrap();

        let topic = db.get_topic(root).await.unwrap().unwrap();
        assert_eq!(topic.reply_count, 0);
        let reply = db.get_reply(uri).await.unwrap().unwrap();
        assert!(reply.author_deleted);
    }

    #[sqlx::test]
    async fn reply_count_floors_at_zero(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        let root = setup_topic(&db, now).await;
        db.insert_user_stub("replier", None, now).await.unwrap();

        let uri = "at://replier/forum.x.topic.reply/1";
        db.create_reply(&NewReply {
            uri,
            record_key: "1",
            author_repo_id: "replier",
            content: "hi",
            root_uri: root,
            root_cid: "bafy0",
            root_author_repo_id: "topic-author",
            parent_uri: root,
            parent_cid: "bafy0",
            community_id: "",
            created_at: now,
            trust_status: TrustStatus::Trusted,
        })
        .await
        .unwrap();

        db.soft_delete_reply(uri).await.unwrap();
        // A second soft-delete (e.g. a replayed delete event) must not drive
        // the root's reply_count negative.
        db.soft_delete_reply(uri).await.unwrap();

        let topic = db.get_topic(root).await.unwrap().unwrap();
        assert_eq!(topic.reply_count, 0);
    }
}
