//! Relational store for the forum backend (§3, §4.1–§4.4, §4.11–§4.13).
//!
//! Mirrors `rostra-client-db`'s shape — one `Database` handle, one
//! `*_ops.rs` module per entity family, a `models.rs` of typed rows — but
//! backed by `sqlx`/Postgres rather than an embedded `redb`, since this store
//! is shared across the ingestion pipeline and the reputation job rather than
//! owned by a single process.

pub mod analytics_ops;
pub mod behavioral_ops;
pub mod cluster_ops;
mod cursor_ops;
pub mod edge_ops;
pub mod mod_action_ops;
pub mod models;
pub mod reaction_ops;
pub mod reply_ops;
mod sanitize;
pub mod topic_ops;
pub mod tracked_repo_ops;
pub mod trust_ops;
mod user_ops;

use std::result;

use snafu::{ResultExt as _, Snafu};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use cursor_ops::CursorStore;
pub use sanitize::{normalize_and_sanitize_content, sanitize_title};

const LOG_TARGET: &str = "forum::db";

#[derive(Debug, Snafu)]
pub enum DbError {
    #[snafu(display("Failed to connect to the relational store: {source}"))]
    Connect { source: sqlx::Error },
    #[snafu(display("Failed to run migrations: {source}"))]
    Migrate { source: sqlx::migrate::MigrateError },
    #[snafu(display("Query failed: {source}"))]
    Query { source: sqlx::Error },
}

pub type DbResult<T> = result::Result<T, DbError>;

impl From<sqlx::Error> for DbError {
    fn from(source: sqlx::Error) -> Self {
        DbError::Query { source }
    }
}

/// Handle to the relational store. Cheaply `Clone`-able (wraps a pool).
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(database_url)
            .await
            .context(ConnectSnafu)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context(MigrateSnafu)?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Whether a live (freshly observed) or backfilled event's declared
/// `createdAt` should be clamped to the server wall clock (§4.3 "Timestamp
/// clamp"). Backfill events are trusted verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventProvenance {
    Live,
    Backfill,
}

/// Clamp a claimed timestamp to `now` for live events that are implausibly in
/// the future or the past; pass backfilled timestamps through unchanged.
pub fn clamp_timestamp(
    claimed: time::OffsetDateTime,
    now: time::OffsetDateTime,
    provenance: EventProvenance,
) -> time::OffsetDateTime {
    if provenance == EventProvenance::Backfill {
        return claimed;
    }
    const MAX_PAST: time::Duration = time::Duration::days(365 * 5);
    const MAX_FUTURE: time::Duration = time::Duration::minutes(5);
    if claimed > now + MAX_FUTURE || claimed < now - MAX_PAST {
        now
    } else {
        claimed
    }
}

#[cfg(test)]
mod clamp_tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn backfill_passes_through_verbatim() {
        let claimed = datetime!(1990-01-01 0:00 UTC);
        let now = datetime!(2026-07-30 0:00 UTC);
        assert_eq!(
            clamp_timestamp(claimed, now, EventProvenance::Backfill),
            claimed
        );
    }

    #[test]
    fn live_future_timestamp_is_clamped() {
        let now = datetime!(2026-07-30 0:00 UTC);
        let claimed = now + time::Duration::days(1);
        assert_eq!(clamp_timestamp(claimed, now, EventProvenance::Live), now);
    }

    #[test]
    fn live_plausible_timestamp_is_kept() {
        let now = datetime!(2026-07-30 0:00 UTC);
        let claimed = now - time::Duration::minutes(1);
        assert_eq!(clamp_timestamp(claimed, now, EventProvenance::Live), claimed);
    }
}
