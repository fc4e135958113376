//! Ingestion service (§4.8). Owns the live subscription: restores tracked
//! repos, connects to the upstream stream in the background, dispatches
//! events, and checkpoints the cursor after each event is applied.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use forum_core::{IdentityEvent, RecordEvent};
use forum_db::CursorStore;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::dispatcher::Dispatcher;
use crate::identity;
use crate::repo_tracker::{RepoTracker, UpstreamClient, UpstreamError};

const LOG_TARGET: &str = "forum::ingest::service";
const NO_EVENT_SENTINEL: i64 = -1;

/// One item on the upstream firehose's multiplexed event channel.
pub enum UpstreamEvent {
    Record(RecordEvent),
    Identity(IdentityEvent),
    Error(UpstreamError),
}

/// Abstracts the upstream firehose connection itself (§6.1): an external
/// collaborator out of this crate's scope (§1), consumed here only as a
/// channel of typed events.
#[async_trait]
pub trait UpstreamStream: Send + Sync + 'static {
    async fn connect(&self, sink: mpsc::Sender<UpstreamEvent>) -> Result<(), UpstreamError>;
}

#[derive(Debug, Clone, Copy)]
pub struct IngestionStatus {
    pub connected: bool,
    pub last_event_id: Option<i64>,
}

pub struct IngestionService<U, S> {
    db: forum_db::Database,
    dispatcher: Arc<Dispatcher>,
    cursor: Arc<CursorStore>,
    repo_tracker: Arc<RepoTracker<U>>,
    upstream: Arc<S>,
    connected: Arc<AtomicBool>,
    last_event_id: Arc<AtomicI64>,
    task: Option<JoinHandle<()>>,
}

impl<U, S> IngestionService<U, S>
where
    U: UpstreamClient + Send + Sync + 'static,
    S: UpstreamStream,
{
    pub fn new(
        db: forum_db::Database,
        dispatcher: Dispatcher,
        cursor: CursorStore,
        repo_tracker: RepoTracker<U>,
        upstream: S,
    ) -> Self {
        Self {
            db,
            dispatcher: Arc::new(dispatcher),
            cursor: Arc::new(cursor),
            repo_tracker: Arc::new(repo_tracker),
            upstream: Arc::new(upstream),
            connected: Arc::new(AtomicBool::new(false)),
            last_event_id: Arc::new(AtomicI64::new(NO_EVENT_SENTINEL)),
            task: None,
        }
    }

    pub fn status(&self) -> IngestionStatus {
        let last = self.last_event_id.load(Ordering::SeqCst);
        IngestionStatus {
            connected: self.connected.load(Ordering::SeqCst),
            last_event_id: if last == NO_EVENT_SENTINEL { None } else { Some(last) },
        }
    }

    /// §4.8 `start()`: restore tracked repos, connect upstream in the
    /// background, set `connected = true`.
    pub async fn start(&mut self) -> Result<(), crate::repo_tracker::RepoTrackerError> {
        self.repo_tracker.restore().await?;

        let (tx, rx) = mpsc::channel(256);
        let upstream = self.upstream.clone();
        tokio::spawn(async move {
            if let Err(err) = upstream.connect(tx).await {
                error!(target: LOG_TARGET, error = %err, "upstream connect failed");
            }
        });

        let db = self.db.clone();
        let dispatcher = self.dispatcher.clone();
        let cursor = self.cursor.clone();
        let last_event_id = self.last_event_id.clone();
        self.task = Some(tokio::spawn(Self::run_loop(db, dispatcher, cursor, last_event_id, rx)));

        self.connected.store(true, Ordering::SeqCst);
        info!(target: LOG_TARGET, "ingestion service started");
        Ok(())
    }

    /// Applies dispatched/identity events as they arrive and checkpoints
    /// the cursor only *after* the event has been applied (§4.8:
    /// "save happens after... giving at-least-once semantics across a
    /// crash").
    async fn run_loop(
        db: forum_db::Database,
        dispatcher: Arc<Dispatcher>,
        cursor: Arc<CursorStore>,
        last_event_id: Arc<AtomicI64>,
        mut rx: mpsc::Receiver<UpstreamEvent>,
    ) {
        while let Some(event) = rx.recv().await {
            let now = OffsetDateTime::now_utc();
            match event {
                UpstreamEvent::Record(record_event) => {
                    let id = record_event.id;
                    if let Err(err) = dispatcher.dispatch(&record_event, now).await {
                        error!(target: LOG_TARGET, error = %err, id, "record dispatch failed");
                    }
                    last_event_id.store(id, Ordering::SeqCst);
                    cursor.save(id).await;
                }
                UpstreamEvent::Identity(identity_event) => {
                    let id = identity_event.id;
                    if let Err(err) = identity::handle_identity_event(&db, &identity_event, now).await {
                        error!(target: LOG_TARGET, error = %err, id, "identity event apply failed");
                    }
                    last_event_id.store(id, Ordering::SeqCst);
                    cursor.save(id).await;
                }
                UpstreamEvent::Error(err) => {
                    error!(target: LOG_TARGET, error = %err, "upstream reported an error, continuing");
                }
            }
        }
    }

    /// §4.8 `stop()`: idempotent. Destroys the channel, flushes the cursor.
    pub async fn stop(&mut self) -> forum_db::DbResult<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.cursor.flush().await?;
        self.connected.store(false, Ordering::SeqCst);
        info!(target: LOG_TARGET, "ingestion service stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::account_age::AccountAgeOracle;
    use crate::repo_tracker::RepoTracker;

    struct NoopUpstream;

    #[async_trait]
    impl UpstreamClient for NoopUpstream {
        async fn add_repo(&self, _repo_id: &str) -> Result<(), UpstreamError> {
            Ok(())
        }
        async fn remove_repo(&self, _repo_id: &str) -> Result<(), UpstreamError> {
            Ok(())
        }
    }

    /// Immediately pushes one record event then lets the channel close.
    struct OneShotStream {
        event: std::sync::Mutex<Option<RecordEvent>>,
    }

    #[async_trait]
    impl UpstreamStream for OneShotStream {
        async fn connect(&self, sink: mpsc::Sender<UpstreamEvent>) -> Result<(), UpstreamError> {
            if let Some(event) = self.event.lock().unwrap().take() {
                let _ = sink.send(UpstreamEvent::Record(event)).await;
            }
            Ok(())
        }
    }

    #[sqlx::test]
    async fn start_dispatches_events_and_advances_the_cursor(pool: sqlx::PgPool) {
        let db = forum_db::Database::from_pool(pool);
        let oracle = AccountAgeOracle::new("http://127.0.0.1:1/directory".to_string());
        let dispatcher = Dispatcher::new(db.clone(), oracle);
        let cursor = CursorStore::with_debounce(db.clone(), Duration::from_millis(10));
        let repo_tracker = RepoTracker::new(db.clone(), NoopUpstream);
        let record = json!({
            "title": "Hello", "content": "World", "category": "general",
            "community": "", "createdAt": "2026-07-30T12:00:00Z",
        });
        let event = RecordEvent {
            id: 7,
            action: forum_core::RecordAction::Create,
            did: "did:plc:alice".to_string(),
            rev: "rev1".to_string(),
            collection: "forum.x.topic.post".to_string(),
            rkey: "1".to_string(),
            record: Some(record),
            cid: Some("bafy1".to_string()),
            live: true,
        };
        let upstream = OneShotStream {
            event: std::sync::Mutex::new(Some(event)),
        };

        let mut service = IngestionService::new(db.clone(), dispatcher, cursor, repo_tracker, upstream);
        service.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(service.status().last_event_id, Some(7));
        assert!(service.status().connected);

        service.stop().await.unwrap();
        assert!(!service.status().connected);

        let topic = db
            .get_topic("at://did:plc:alice/forum.x.topic.post/1")
            .await
            .unwrap();
        assert!(topic.is_some());
    }
}
