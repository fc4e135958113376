//! Durable set of tracked repo-ids (§4.7 "Repo tracker"). This module owns
//! only the storage half; `forum-ingest::repo_tracker` layers the upstream
//! subscription sync on top.

use crate::{DbResult, Database};

impl Database {
    pub async fn track_repo(&self, repo_id: &str) -> DbResult<()> {
        sqlx::query("INSERT INTO tracked_repos (repo_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(repo_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn untrack_repo(&self, repo_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM tracked_repos WHERE repo_id = $1")
            .bind(repo_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn is_tracked(&self, repo_id: &str) -> DbResult<bool> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM tracked_repos WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }

    pub async fn list_tracked_repos(&self) -> DbResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT repo_id FROM tracked_repos")
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
