//! Record dispatcher (§4.5). Validates, resolves trust status for new
//! authors, and fans out to the collection's indexer. Any oracle or DB
//! error in the trust-resolution path fails open to `trusted` rather than
//! blocking the event.

use forum_core::{CollectionNsid, RecordAction, RecordEvent, RecordUri, TrustStatus};
use forum_db::{EventProvenance, clamp_timestamp};
use forum_db::reaction_ops::NewReaction;
use forum_db::reply_ops::{NewReply, ReplyEdit};
use forum_db::topic_ops::{NewTopic, TopicEdit};
use serde_json::Value;
use snafu::Snafu;
use time::OffsetDateTime;
use tracing::warn;

use crate::account_age::{AccountAgeOracle, determine_trust_status};
use crate::validator::{self, ValidationError};

const LOG_TARGET: &str = "forum::ingest::dispatcher";

#[derive(Debug, Snafu)]
pub enum DispatchError {
    #[snafu(display("record failed validation: {source}"))]
    Invalid { source: ValidationError },
    #[snafu(display("store error: {source}"))]
    Store { source: forum_db::DbError },
}

impl From<forum_db::DbError> for DispatchError {
    fn from(source: forum_db::DbError) -> Self {
        DispatchError::Store { source }
    }
}

pub struct Dispatcher {
    db: forum_db::Database,
    oracle: AccountAgeOracle,
}

impl Dispatcher {
    pub fn new(db: forum_db::Database, oracle: AccountAgeOracle) -> Self {
        Self { db, oracle }
    }

    pub async fn dispatch(&self, event: &RecordEvent, now: OffsetDateTime) -> Result<(), DispatchError> {
        let Some(record) = &event.record else {
            if event.action == RecordAction::Delete {
                return self.dispatch_delete(event).await;
            }
            return Ok(());
        };

        let collection = match validator::validate(&event.collection, record) {
            Ok(collection) => collection,
            Err(ValidationError::UnsupportedCollection { .. }) => return Ok(()),
            Err(source) => return Err(DispatchError::Invalid { source }),
        };

        let uri = RecordUri::new(event.did.clone(), event.collection.clone(), event.rkey.clone());

        match event.action {
            RecordAction::Create => {
                let trust_status = self.resolve_trust_status(&event.did, now).await;
                self.create(collection, &uri, event, record, trust_status, now).await
            }
            RecordAction::Update => self.update(collection, &uri, event, record, now).await,
            RecordAction::Delete => self.dispatch_delete(event).await,
        }
    }

    /// §4.5 steps 1–3, failing open to `trusted` on any oracle/DB error.
    async fn resolve_trust_status(&self, repo_id: &str, now: OffsetDateTime) -> TrustStatus {
        let existing = match self.db.get_user(repo_id).await {
            Ok(user) => user,
            Err(err) => {
                warn!(target: LOG_TARGET, repo_id, error = %err, "trust resolution DB read failed, failing open");
                return TrustStatus::Trusted;
            }
        };

        let account_created_at = match existing {
            Some(user) if user.account_created_at.is_some() => user.account_created_at,
            Some(_) => {
                let resolved = self.oracle.resolve_creation_date(repo_id).await;
                if let Err(err) = self.db.backfill_account_created_at(repo_id, resolved).await {
                    warn!(target: LOG_TARGET, repo_id, error = %err, "failed to backfill account_created_at");
                }
                resolved
            }
            None => {
                let resolved = self.oracle.resolve_creation_date(repo_id).await;
                if let Err(err) = self.db.insert_user_stub(repo_id, resolved, now).await {
                    warn!(target: LOG_TARGET, repo_id, error = %err, "failed to insert user stub");
                }
                resolved
            }
        };

        determine_trust_status(account_created_at, now)
    }

    async fn create(
        &self,
        collection: CollectionNsid,
        uri: &RecordUri,
        event: &RecordEvent,
        record: &Value,
        trust_status: TrustStatus,
        now: OffsetDateTime,
    ) -> Result<(), DispatchError> {
        let provenance = if event.live {
            EventProvenance::Live
        } else {
            EventProvenance::Backfill
        };
        let claimed_created_at = parse_created_at(record).unwrap_or(now);
        let created_at = clamp_timestamp(claimed_created_at, now, provenance);
        let community_id = record.get("community").and_then(Value::as_str).unwrap_or("");
        let cid = event.cid.as_deref().unwrap_or("");

        match collection {
            CollectionNsid::TopicPost => {
                let title = record.get("title").and_then(Value::as_str).unwrap_or("");
                let content = record.get("content").and_then(Value::as_str).unwrap_or("");
                let category = record.get("category").and_then(Value::as_str).unwrap_or("");
                let tags: Vec<String> = record
                    .get("tags")
                    .and_then(Value::as_array)
                    .map(|tags| tags.iter().filter_map(|t| t.as_str().map(String::from)).collect())
                    .unwrap_or_default();
                let self_labels = extract_self_labels(record);

                self.db
                    .create_topic(&NewTopic {
                        uri: &uri.to_string(),
                        record_key: &event.rkey,
                        author_repo_id: &event.did,
                        title,
                        content,
                        category,
                        tags: &tags,
                        community_id,
                        cid,
                        self_labels: &self_labels,
                        created_at,
                        trust_status,
                    })
                    .await?;
            }
            CollectionNsid::TopicReply => {
                let content = record.get("content").and_then(Value::as_str).unwrap_or("");
                let root = record.get("root");
                let parent = record.get("parent");
                let root_uri = root.and_then(|r| r.get("uri")).and_then(Value::as_str).unwrap_or("");
                let root_cid = root.and_then(|r| r.get("cid")).and_then(Value::as_str).unwrap_or("");
                let parent_uri = parent.and_then(|p| p.get("uri")).and_then(Value::as_str).unwrap_or("");
                let parent_cid = parent.and_then(|p| p.get("cid")).and_then(Value::as_str).unwrap_or("");

                let root_author_repo_id = root_uri
                    .parse::<RecordUri>()
                    .map(|parsed| parsed.repo_id().to_string())
                    .unwrap_or_default();

                self.db
                    .create_reply(&NewReply {
                        uri: &uri.to_string(),
                        record_key: &event.rkey,
                        author_repo_id: &event.did,
                        content,
                        root_uri,
                        root_cid,
                        root_author_repo_id: &root_author_repo_id,
                        parent_uri,
                        parent_cid,
                        community_id,
                        created_at,
                        trust_status,
                    })
                    .await?;
            }
            CollectionNsid::Reaction => {
                let subject = record.get("subject");
                let subject_uri = subject.and_then(|s| s.get("uri")).and_then(Value::as_str).unwrap_or("");
                let subject_cid = subject.and_then(|s| s.get("cid")).and_then(Value::as_str).unwrap_or("");
                let reaction_type = record.get("type").and_then(Value::as_str).unwrap_or("");

                self.db
                    .create_reaction(&NewReaction {
                        uri: &uri.to_string(),
                        author_repo_id: &event.did,
                        subject_uri,
                        subject_cid,
                        reaction_type,
                        community_id,
                        created_at,
                    })
                    .await?;
            }
        }
        Ok(())
    }

    async fn update(
        &self,
        collection: CollectionNsid,
        uri: &RecordUri,
        event: &RecordEvent,
        record: &Value,
        now: OffsetDateTime,
    ) -> Result<(), DispatchError> {
        let cid = event.cid.as_deref().unwrap_or("");
        match collection {
            CollectionNsid::TopicPost => {
                let title = record.get("title").and_then(Value::as_str).unwrap_or("");
                let content = record.get("content").and_then(Value::as_str).unwrap_or("");
                let category = record.get("category").and_then(Value::as_str).unwrap_or("");
                let tags: Vec<String> = record
                    .get("tags")
                    .and_then(Value::as_array)
                    .map(|tags| tags.iter().filter_map(|t| t.as_str().map(String::from)).collect())
                    .unwrap_or_default();
                let self_labels = extract_self_labels(record);
                self.db
                    .update_topic(
                        &uri.to_string(),
                        &TopicEdit {
                            title,
                            content,
                            category,
                            tags: &tags,
                            cid,
                            self_labels: &self_labels,
                        },
                        now,
                    )
                    .await?;
            }
            CollectionNsid::TopicReply => {
                let content = record.get("content").and_then(Value::as_str).unwrap_or("");
                self.db
                    .update_reply(&uri.to_string(), &ReplyEdit { content, cid }, now)
                    .await?;
            }
            CollectionNsid::Reaction => {
                // §4.3: "No update" path exists for reactions.
            }
        }
        Ok(())
    }

    async fn dispatch_delete(&self, event: &RecordEvent) -> Result<(), DispatchError> {
        let Some(collection) = CollectionNsid::from_nsid(&event.collection) else {
            return Ok(());
        };
        let uri = RecordUri::new(event.did.clone(), event.collection.clone(), event.rkey.clone()).to_string();
        match collection {
            CollectionNsid::TopicPost => self.db.soft_delete_topic(&uri).await?,
            CollectionNsid::TopicReply => self.db.soft_delete_reply(&uri).await?,
            CollectionNsid::Reaction => self.db.delete_reaction(&uri).await?,
        }
        Ok(())
    }
}

fn parse_created_at(record: &Value) -> Option<OffsetDateTime> {
    let raw = record.get("createdAt").and_then(Value::as_str)?;
    OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339).ok()
}

fn extract_self_labels(record: &Value) -> Vec<String> {
    record
        .get("labels")
        .and_then(|labels| labels.get("values"))
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.get("val").and_then(Value::as_str).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
