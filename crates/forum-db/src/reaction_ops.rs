//! Reaction indexer (§4.3 "Reaction indexer").

use forum_core::{CollectionNsid, InteractionKind};
use time::OffsetDateTime;

use crate::edge_ops;
use crate::models::ReactionRow;
use crate::reply_ops::Database as ReplyDbMethods;
use crate::topic_ops::Database as TopicDbMethods;
use crate::{DbResult, Database};

pub struct NewReaction<'a> {
    pub uri: &'a str,
    pub author_repo_id: &'a str,
    pub subject_uri: &'a str,
    pub subject_cid: &'a str,
    pub reaction_type: &'a str,
    pub community_id: &'a str,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionCreateOutcome {
    Inserted,
    /// (author, subject, type) already exists (§3 uniqueness).
    AlreadyExists,
}

/// Which aggregate a reaction's subject URI points at, discriminated by
/// parsing the collection segment (§4.3: "discriminated by parsing the
/// collection segment of the subject URI").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionSubjectKind {
    Topic,
    Reply,
}

pub fn classify_subject(subject_uri: &str) -> Option<ReactionSubjectKind> {
    let uri: forum_core::RecordUri = subject_uri.parse().ok()?;
    match CollectionNsid::from_nsid(uri.collection())? {
        CollectionNsid::TopicPost => Some(ReactionSubjectKind::Topic),
        CollectionNsid::TopicReply => Some(ReactionSubjectKind::Reply),
        CollectionNsid::Reaction => None,
    }
}

impl Database {
    /// Insert a reaction and, in the same transaction, increment the
    /// subject's reaction count (§4.3). Idempotent on the (author, subject,
    /// type) uniqueness.
    pub async fn create_reaction(&self, new: &NewReaction<'_>) -> DbResult<ReactionCreateOutcome> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            "INSERT INTO reactions
                (uri, author_repo_id, subject_uri, subject_cid, reaction_type, community_id, created_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7)
             ON CONFLICT (author_repo_id, subject_uri, reaction_type) DO NOTHING",
        )
        .bind(new.uri)
        .bind(new.author_repo_id)
        .bind(new.subject_uri)
        .bind(new.subject_cid)
        .bind(new.reaction_type)
        .bind(new.community_id)
        .bind(new.created_at)
        .execute(&mut *tx)
        .await?;

        let outcome = if result.rows_affected() == 1 {
            let subject_author: Option<(String,)> = match classify_subject(new.subject_uri) {
                Some(ReactionSubjectKind::Topic) => {
                    TopicDbMethods::bump_reaction_count_on_topic(&mut tx, new.subject_uri).await?;
                    sqlx::query_as("SELECT author_repo_id FROM topics WHERE uri = $1")
                        .bind(new.subject_uri)
                        .fetch_optional(&mut *tx)
                        .await?
                }
                Some(ReactionSubjectKind::Reply) => {
                    ReplyDbMethods::bump_reaction_count_on_reply(&mut tx, new.subject_uri).await?;
                    sqlx::query_as("SELECT author_repo_id FROM replies WHERE uri = $1")
                        .bind(new.subject_uri)
                        .fetch_optional(&mut *tx)
                        .await?
                }
                None => None,
            };
            if let Some((subject_author,)) = subject_author {
                edge_ops::upsert_edge(
                    &mut tx,
                    new.author_repo_id,
                    &subject_author,
                    new.community_id,
                    InteractionKind::Reaction,
                    new.created_at,
                )
                .await?;
            }
            ReactionCreateOutcome::Inserted
        } else {
            ReactionCreateOutcome::AlreadyExists
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Remove the row and decrement the subject's floored count (§4.3). No
    /// update path exists for reactions.
    pub async fn delete_reaction(&self, uri: &str) -> DbResult<()> {
        let mut tx = self.pool().begin().await?;
        let row: Option<ReactionRow> =
            sqlx::query_as("SELECT * FROM reactions WHERE uri = $1")
                .bind(uri)
                .fetch_optional(&mut *tx)
                .await?;
        sqlx::query("DELETE FROM reactions WHERE uri = $1")
            .bind(uri)
            .execute(&mut *tx)
            .await?;
        if let Some(row) = row {
            match classify_subject(&row.subject_uri) {
                Some(ReactionSubjectKind::Topic) => {
                    TopicDbMethods::decrement_reaction_count_on_topic(&mut tx, &row.subject_uri)
                        .await?;
                }
                Some(ReactionSubjectKind::Reply) => {
                    ReplyDbMethods::decrement_reaction_count_on_reply(&mut tx, &row.subject_uri)
                        .await?;
                }
                None => {}
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use forum_core::TrustStatus;
    use time::macros::datetime;

    use super::*;
    use crate::topic_ops::NewTopic;

    #[test]
    fn classifies_topic_and_reply_subjects() {
        assert_eq!(
            classify_subject("at://a/forum.x.topic.post/1"),
            Some(ReactionSubjectKind::Topic)
        );
        assert_eq!(
            classify_subject("at://a/forum.x.topic.reply/1"),
            Some(ReactionSubjectKind::Reply)
        );
        assert_eq!(classify_subject("at://a/forum.x.interaction.reaction/1"), None);
    }

    #[sqlx::test]
    async fn create_increments_topic_reaction_count_and_delete_decrements(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        db.insert_user_stub("author", None, now).await.unwrap();
        db.insert_user_stub("reactor", None, now).await.unwrap();

        let topic_uri = "at://author/forum.x.topic.post/1";
        db.create_topic(&NewTopic {
            uri: topic_uri,
            record_key: "1",
            author_repo_id: "author",
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

        let reaction_uri = "at://reactor/forum.x.interaction.reaction/1";
        let outcome = db
            .create_reaction(&NewReaction {
                uri: reaction_uri,
                author_repo_id: "reactor",
                subject_uri: topic_uri,
                subject_cid: "bafy0",
                reaction_type: "like",
                community_id: "",
                created_at: now,
            })
            .await
            .unwrap();
        assert_eq!(outcome, ReactionCreateOutcome::Inserted);

        let topic = db.get_topic(topic_uri).await.unwrap().unwrap();
        assert_eq!(topic.reaction_count, 1);

        db.delete_reaction(reaction_uri).await.unwrap();
        let topic = db.get_topic(topic_uri).await.unwrap().unwrap();
        assert_eq!(topic.reaction_count, 0);
    }

    #[sqlx::test]
    async fn duplicate_author_subject_type_is_rejected(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        db.insert_user_stub("author", None, now).await.unwrap();
        db.insert_user_stub("reactor", None, now).await.unwrap();
        let topic_uri = "at://author/forum.x.topic.post/1";
        db.create_topic(&NewTopic {
            uri: topic_uri,
            record_key: "1",
            author_repo_id: "author",
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

        let new = NewReaction {
            uri: "at://reactor/forum.x.interaction.reaction/1",
            author_repo_id: "reactor",
            subject_uri: topic_uri,
            subject_cid: "bafy0",
            reaction_type: "like",
            community_id: "",
            created_at: now,
        };
        assert_eq!(db.create_reaction(&new).await.unwrap(), ReactionCreateOutcome::Inserted);

        let dup = NewReaction {
            uri: "at://reactor/forum.x.interaction.reaction/2",
            ..new
        };
        assert_eq!(db.create_reaction(&dup).await.unwrap(), ReactionCreateOutcome::AlreadyExists);

        let topic = db.get_topic(topic_uri).await.unwrap().unwrap();
        assert_eq!(topic.reaction_count, 1);
    }
}
