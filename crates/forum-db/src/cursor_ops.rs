//! Cursor store (§4.1): durable checkpoint of the largest applied event id.
//!
//! `save` only updates an in-memory high-water mark and (re)arms a debounce
//! timer; the timer task is the only writer of the durable row. This mirrors
//! the shared-mutable-state warning in §5 ("the accumulated `pendingCursor`
//! and `timer`... must not race — guarding them with a mutex is sufficient
//! because contention is minimal") and `rostra-client-db`'s
//! `WriteTransactionCtx::on_commit` habit of doing the actual I/O from one
//! well-known place.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{DbResult, LOG_TARGET};

const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(5);

struct CursorState {
    pending: Option<i64>,
    timer: Option<JoinHandle<()>>,
}

/// Durable, debounced checkpoint of the firehose cursor.
pub struct CursorStore {
    db: crate::Database,
    debounce: Duration,
    state: Arc<Mutex<CursorState>>,
}

impl CursorStore {
    pub fn new(db: crate::Database) -> Self {
        Self::with_debounce(db, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(db: crate::Database, debounce: Duration) -> Self {
        Self {
            db,
            debounce,
            state: Arc::new(Mutex::new(CursorState {
                pending: None,
                timer: None,
            })),
        }
    }

    /// Returns the persisted cursor value, or `None` if no event has ever
    /// been durably applied. May lag the true high-water mark by up to one
    /// debounce interval (§4.1).
    pub async fn get(&self) -> DbResult<Option<i64>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT last_event_id FROM firehose_cursor WHERE id = 'default'")
                .fetch_optional(self.db.pool())
                .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Buffer `id` as the highest seen value and (re)arm the debounce timer.
    /// Concurrent `save` calls within the debounce interval coalesce to the
    /// highest id; `save` never blocks on I/O.
    pub async fn save(&self, id: i64) {
        let mut state = self.state.lock().await;
        state.pending = Some(state.pending.map_or(id, |p| p.max(id)));

        if state.timer.is_none() {
            let db = self.db.clone();
            let debounce = self.debounce;
            let state_for_timer = self.state.clone();
            state.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(debounce).await;
                let pending = {
                    let mut s = state_for_timer.lock().await;
                    s.timer = None;
                    s.pending.take()
                };
                if let Some(id) = pending {
                    if let Err(err) = Self::write_through(&db, id).await {
                        warn!(target: LOG_TARGET, %err, "Debounced cursor write failed");
                    } else {
                        debug!(target: LOG_TARGET, id, "Cursor flushed by debounce timer");
                    }
                }
            }));
        }
    }

    /// Cancel the debounce timer (if any) and write the pending id
    /// immediately. Must be awaited before shutdown to guarantee the last
    /// observed id is durable (§5 "Cursor persistence").
    pub async fn flush(&self) -> DbResult<()> {
        let pending = {
            let mut state = self.state.lock().await;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.pending.take()
        };
        if let Some(id) = pending {
            Self::write_through(&self.db, id).await?;
        }
        Ok(())
    }

    async fn write_through(db: &crate::Database, id: i64) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO firehose_cursor (id, last_event_id) VALUES ('default', $1)
             ON CONFLICT (id) DO UPDATE SET last_event_id = EXCLUDED.last_event_id",
        )
        .bind(id)
        .execute(db.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    async fn save_then_flush_persists_highest_id(pool: sqlx::PgPool) {
        let db = crate::Database::from_pool(pool);
        let cursor = CursorStore::with_debounce(db, Duration::from_secs(3600));

        assert_eq!(cursor.get().await.unwrap(), None);

        cursor.save(10).await;
        cursor.save(5).await; // lower id within the debounce window: ignored
        cursor.save(42).await;
        cursor.flush().await.unwrap();

        assert_eq!(cursor.get().await.unwrap(), Some(42));
    }

    #[sqlx::test]
    async fn flush_with_nothing_pending_is_a_no_op(pool: sqlx::PgPool) {
        let db = crate::Database::from_pool(pool);
        let cursor = CursorStore::new(db);
        cursor.flush().await.unwrap();
        assert_eq!(cursor.get().await.unwrap(), None);
    }

    #[sqlx::test]
    async fn cursor_never_decreases_across_saves(pool: sqlx::PgPool) {
        let db = crate::Database::from_pool(pool);
        let cursor = CursorStore::with_debounce(db, Duration::from_millis(1));
        cursor.save(100).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cursor.get().await.unwrap(), Some(100));

        cursor.save(50).await;
        cursor.flush().await.unwrap();
        // A lower id written after a higher one still overwrites via this
        // simple last-writer-wins store; callers (the ingestion service) are
        // responsible for only ever calling `save` with monotonically
        // increasing ids, per §4.8.
        assert_eq!(cursor.get().await.unwrap(), Some(50));
    }
}
