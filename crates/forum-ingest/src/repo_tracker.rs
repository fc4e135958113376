//! Repo tracker (§4.7). Keeps the durable tracked-repo set and the upstream
//! subscription in sync.

use async_trait::async_trait;
use snafu::{ResultExt as _, Snafu};
use tracing::{info, warn};

const LOG_TARGET: &str = "forum::ingest::repo_tracker";
const RESTORE_BATCH_SIZE: usize = 100;

#[derive(Debug, Snafu)]
pub enum RepoTrackerError {
    #[snafu(display("store error: {source}"))]
    Store { source: forum_db::DbError },
    #[snafu(display("upstream subscription error: {source}"))]
    Upstream { source: UpstreamError },
}

impl From<forum_db::DbError> for RepoTrackerError {
    fn from(source: forum_db::DbError) -> Self {
        RepoTrackerError::Store { source }
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("{message}"))]
pub struct UpstreamError {
    pub message: String,
}

/// Abstracts the upstream firehose subscription's repo add/remove calls.
/// The concrete transport (an out-of-scope external collaborator, §1) lives
/// behind this trait so the tracker and its tests don't depend on it.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn add_repo(&self, repo_id: &str) -> Result<(), UpstreamError>;
    async fn remove_repo(&self, repo_id: &str) -> Result<(), UpstreamError>;
    async fn add_repos(&self, repo_ids: &[String]) -> Result<(), UpstreamError> {
        for repo_id in repo_ids {
            self.add_repo(repo_id).await?;
        }
        Ok(())
    }
}

pub struct RepoTracker<U> {
    db: forum_db::Database,
    upstream: U,
}

impl<U: UpstreamClient> RepoTracker<U> {
    pub fn new(db: forum_db::Database, upstream: U) -> Self {
        Self { db, upstream }
    }

    pub async fn track(&self, repo_id: &str) -> Result<(), RepoTrackerError> {
        self.db.track_repo(repo_id).await?;
        self.upstream.add_repo(repo_id).await.context(UpstreamSnafu)?;
        Ok(())
    }

    pub async fn untrack(&self, repo_id: &str) -> Result<(), RepoTrackerError> {
        self.db.untrack_repo(repo_id).await?;
        self.upstream.remove_repo(repo_id).await.context(UpstreamSnafu)?;
        Ok(())
    }

    pub async fn is_tracked(&self, repo_id: &str) -> Result<bool, RepoTrackerError> {
        Ok(self.db.is_tracked(repo_id).await?)
    }

    /// Startup recovery: read the full tracked set and re-add it to the
    /// upstream subscription in batches of 100 (§4.7).
    pub async fn restore(&self) -> Result<(), RepoTrackerError> {
        let repo_ids = self.db.list_tracked_repos().await?;
        info!(target: LOG_TARGET, count = repo_ids.len(), "restoring tracked repos to upstream");
        for batch in repo_ids.chunks(RESTORE_BATCH_SIZE) {
            if let Err(err) = self.upstream.add_repos(batch).await {
                warn!(target: LOG_TARGET, error = %err, batch_len = batch.len(), "failed to restore a batch, continuing");
            }
        }
        Ok(())
    }
}
