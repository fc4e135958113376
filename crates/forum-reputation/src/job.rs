//! Periodic reputation job driver (§5 "Reputation job").
//!
//! Single-flight: at most one run at a time, gated by a `JobStatus` state
//! machine behind a mutex, mirroring `rostra/src/main.rs`'s `DevCmd::Test`
//! periodic loop shape (`tokio::time::interval`).

use std::sync::Arc;

use forum_core::GLOBAL_SCOPE;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::eigentrust;
use crate::heuristics;
use crate::sybil;

const LOG_TARGET: &str = "forum::reputation::job";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ReputationRunSummary {
    pub scope: String,
    pub eigentrust_converged: bool,
    pub eigentrust_iterations: u32,
    pub clusters_detected: usize,
    pub total_low_trust_ids: usize,
    pub burst_voting_flags: usize,
    pub low_diversity_flags: usize,
    pub content_similarity_flags: usize,
}

pub struct ReputationJob {
    db: forum_db::Database,
    status: Arc<Mutex<JobStatus>>,
}

impl ReputationJob {
    pub fn new(db: forum_db::Database) -> Self {
        Self {
            db,
            status: Arc::new(Mutex::new(JobStatus::Idle)),
        }
    }

    pub async fn status(&self) -> JobStatus {
        *self.status.lock().await
    }

    /// Run the reputation pipeline (EigenTrust → sybil detector →
    /// behavioral heuristics) for every known scope, skipping re-entry if
    /// a run is already in flight.
    pub async fn run_once(&self, now: OffsetDateTime) -> forum_db::DbResult<Vec<ReputationRunSummary>> {
        {
            let mut status = self.status.lock().await;
            if *status == JobStatus::Running {
                warn!(target: LOG_TARGET, "reputation job already running, skipping re-entry");
                return Ok(Vec::new());
            }
            *status = JobStatus::Running;
        }

        let result = self.run_all_scopes(now).await;

        let mut status = self.status.lock().await;
        *status = if result.is_ok() {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };

        result
    }

    async fn run_all_scopes(&self, now: OffsetDateTime) -> forum_db::DbResult<Vec<ReputationRunSummary>> {
        let mut scopes = self.db.list_community_ids().await?;
        scopes.push(GLOBAL_SCOPE.to_string());

        let mut summaries = Vec::new();
        for scope in scopes {
            let eigentrust = eigentrust::run_for_scope(&self.db, &scope, now).await?;
            let sybil_summary = sybil::detect_for_scope(&self.db, &scope, now).await?;

            // Behavioral heuristics aren't scope-scoped in §4.12; run them
            // once overall (on the global scope pass) rather than once per
            // community, since they scan reactions/content independent of
            // community_id. Each detector persists its flags independently
            // (§4.12): a failure in one must not block the others or abort
            // the remaining scopes, so each runs to completion on its own
            // rather than being chained with `?`.
            let (burst, diversity, similarity) = if scope == GLOBAL_SCOPE {
                let burst = match heuristics::detect_burst_voting(&self.db, now).await {
                    Ok(flagged) => flagged,
                    Err(err) => {
                        warn!(target: LOG_TARGET, error = %err, "burst voting detector failed, skipping");
                        0
                    }
                };
                let diversity = match heuristics::detect_low_diversity(&self.db, now).await {
                    Ok(flagged) => flagged,
                    Err(err) => {
                        warn!(target: LOG_TARGET, error = %err, "low diversity detector failed, skipping");
                        0
                    }
                };
                let similarity = match heuristics::detect_content_similarity(&self.db, now).await {
                    Ok(flagged) => flagged,
                    Err(err) => {
                        warn!(target: LOG_TARGET, error = %err, "content similarity detector failed, skipping");
                        0
                    }
                };
                (burst, diversity, similarity)
            } else {
                (0, 0, 0)
            };

            info!(
                target: LOG_TARGET,
                scope = %scope,
                converged = eigentrust.converged,
                clusters = sybil_summary.clusters_detected,
                "reputation run complete for scope"
            );

            summaries.push(ReputationRunSummary {
                scope,
                eigentrust_converged: eigentrust.converged,
                eigentrust_iterations: eigentrust.iterations,
                clusters_detected: sybil_summary.clusters_detected,
                total_low_trust_ids: sybil_summary.total_low_trust_ids,
                burst_voting_flags: burst,
                low_diversity_flags: diversity,
                content_similarity_flags: similarity,
            });
        }

        Ok(summaries)
    }

    /// Spawn the periodic driver; runs until the returned handle is
    /// aborted or dropped.
    pub fn spawn_periodic(self: Arc<Self>, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = OffsetDateTime::now_utc();
                if let Err(err) = self.run_once(now).await {
                    warn!(target: LOG_TARGET, error = %err, "reputation job run failed");
                }
            }
        })
    }
}
