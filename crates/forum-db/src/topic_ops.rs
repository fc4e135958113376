//! Topic indexer (§4.3 "Topic indexer").

use forum_core::TrustStatus;
use time::OffsetDateTime;

use crate::models::TopicRow;
use crate::sanitize::{normalize_and_sanitize_content, sanitize_title};
use crate::{DbResult, Database};

pub struct NewTopic<'a> {
    pub uri: &'a str,
    pub record_key: &'a str,
    pub author_repo_id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub category: &'a str,
    pub tags: &'a [String],
    pub community_id: &'a str,
    pub cid: &'a str,
    pub self_labels: &'a [String],
    pub created_at: OffsetDateTime,
    pub trust_status: TrustStatus,
}

pub struct TopicEdit<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub category: &'a str,
    pub tags: &'a [String],
    pub cid: &'a str,
    pub self_labels: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicCreateOutcome {
    Inserted,
    /// Duplicate create for an existing URI: idempotent no-op (§4.3).
    AlreadyExists,
}

impl Database {
    pub async fn get_topic(&self, uri: &str) -> DbResult<Option<TopicRow>> {
        let row = sqlx::query_as::<_, TopicRow>("SELECT * FROM topics WHERE uri = $1")
            .bind(uri)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    /// Create upserts a topic row keyed by URI and sets
    /// `last_activity_at = created_at` (§4.3). Idempotent: a duplicate
    /// create for the same URI is a conflict-do-nothing no-op.
    pub async fn create_topic(&self, new: &NewTopic<'_>) -> DbResult<TopicCreateOutcome> {
        let title = sanitize_title(new.title);
        let content = normalize_and_sanitize_content(new.content);
        let result = sqlx::query(
            "INSERT INTO topics
                (uri, record_key, author_repo_id, title, content, category, tags,
                 community_id, cid, self_labels, last_activity_at, created_at, trust_status)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$11,$12)
             ON CONFLICT (uri) DO NOTHING",
        )
        .bind(new.uri)
        .bind(new.record_key)
        .bind(new.author_repo_id)
        .bind(&title)
        .bind(&content)
        .bind(new.category)
        .bind(new.tags)
        .bind(new.community_id)
        .bind(new.cid)
        .bind(new.self_labels)
        .bind(new.created_at)
        .bind(new.trust_status)
        .execute(self.pool())
        .await?;
        Ok(if result.rows_affected() == 1 {
            TopicCreateOutcome::Inserted
        } else {
            TopicCreateOutcome::AlreadyExists
        })
    }

    /// Update overwrites the mutable projection and advances `indexed_at`;
    /// `created_at` is never touched (§4.3).
    pub async fn update_topic(
        &self,
        uri: &str,
        edit: &TopicEdit<'_>,
        now: OffsetDateTime,
    ) -> DbResult<()> {
        let title = sanitize_title(edit.title);
        let content = normalize_and_sanitize_content(edit.content);
        sqlx::query(
            "UPDATE topics SET title = $2, content = $3, category = $4, tags = $5,
                cid = $6, self_labels = $7, indexed_at = $8
             WHERE uri = $1",
        )
        .bind(uri)
        .bind(&title)
        .bind(&content)
        .bind(edit.category)
        .bind(edit.tags)
        .bind(edit.cid)
        .bind(edit.self_labels)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Author-delete is soft: flips `author_deleted`, leaves aggregates and
    /// the row itself for referential integrity (§4.3, §9).
    pub async fn soft_delete_topic(&self, uri: &str) -> DbResult<()> {
        sqlx::query("UPDATE topics SET author_deleted = true WHERE uri = $1")
            .bind(uri)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Increment `reply_count` and bump `last_activity_at` in one statement
    /// (called by the reply indexer inside its own transaction).
    pub async fn bump_topic_for_new_reply(
        tx: &mut sqlx::PgConnection,
        topic_uri: &str,
        now: OffsetDateTime,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE topics SET reply_count = reply_count + 1, last_activity_at = $2 WHERE uri = $1",
        )
        .bind(topic_uri)
        .bind(now)
        .execute(tx)
        .await?;
        Ok(())
    }

    /// Floored decrement (§3 invariant: `reply_count(topic) >= 0`).
    pub async fn decrement_topic_reply_count(
        tx: &mut sqlx::PgConnection,
        topic_uri: &str,
    ) -> DbResult<()> {
        sqlx::query("UPDATE topics SET reply_count = GREATEST(reply_count - 1, 0) WHERE uri = $1")
            .bind(topic_uri)
            .execute(tx)
            .await?;
        Ok(())
    }

    pub async fn bump_reaction_count_on_topic(
        tx: &mut sqlx::PgConnection,
        topic_uri: &str,
    ) -> DbResult<()> {
        sqlx::query("UPDATE topics SET reaction_count = reaction_count + 1 WHERE uri = $1")
            .bind(topic_uri)
            .execute(tx)
            .await?;
        Ok(())
    }

    pub async fn decrement_reaction_count_on_topic(
        tx: &mut sqlx::PgConnection,
        topic_uri: &str,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE topics SET reaction_count = GREATEST(reaction_count - 1, 0) WHERE uri = $1",
        )
        .bind(topic_uri)
        .execute(tx)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn sample(uri: &str, author: &str, now: OffsetDateTime) -> NewTopic<'_> {
        NewTopic {
            uri,
            record_key: "r1",
            author_repo_id: author,
            title: "Hello",
            content: "World",
            category: "general",
            tags: &[],
            community_id: "",
            cid: "bafy1",
            self_labels: &[],
            created_at: now,
            trust_status: TrustStatus::Trusted,
        }
    }

    #[sqlx::test]
    async fn duplicate_create_is_idempotent(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        db.insert_user_stub("author", None, now).await.unwrap();

        let uri = "at://author/forum.x.topic.post/1";
        let outcome1 = db.create_topic(&sample(uri, "author", now)).await.unwrap();
        let outcome2 = db.create_topic(&sample(uri, "author", now)).await.unwrap();

        assert_eq!(outcome1, TopicCreateOutcome::Inserted);
        assert_eq!(outcome2, TopicCreateOutcome::AlreadyExists);

        let topic = db.get_topic(uri).await.unwrap().unwrap();
        assert_eq!(topic.reply_count, 0);
    }

    #[sqlx::test]
    async fn update_advances_indexed_at_but_not_created_at(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let created = datetime!(2026-07-30 12:00 UTC);
        let edited = datetime!(2026-07-30 13:00 UTC);
        db.insert_user_stub("author", None, created).await.unwrap();

        let uri = "at://author/forum.x.topic.post/1";
        db.create_topic(&sample(uri, "author", created)).await.unwrap();
        db.update_topic(
            uri,
            &TopicEdit {
                title: "Edited",
                content: "New body",
                category: "general",
                tags: &[],
                cid: "bafy2",
                self_labels: &[],
            },
            edited,
        )
        .await
        .unwrap();

        let topic = db.get_topic(uri).await.unwrap().unwrap();
        assert_eq!(topic.title, "Edited");
        assert_eq!(topic.created_at, created);
        assert_eq!(topic.indexed_at, edited);
    }

    #[sqlx::test]
    async fn soft_delete_keeps_the_row(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        db.insert_user_stub("author", None, now).await.unwrap();
        let uri = "at://author/forum.x.topic.post/1";
        db.create_topic(&sample(uri, "author", now)).await.unwrap();

        db.soft_delete_topic(uri).await.unwrap();

        let topic = db.get_topic(uri).await.unwrap().unwrap();
        assert!(topic.author_deleted);
    }
}
