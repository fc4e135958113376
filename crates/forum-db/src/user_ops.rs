//! User rows (§3 "User") and the identity handler (§4.4).

use forum_core::Role;
use time::OffsetDateTime;

use crate::models::UserRow;
use crate::{DbResult, Database};

impl Database {
    pub async fn get_user(&self, repo_id: &str) -> DbResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    /// Insert a user row with a handle stubbed to the repo-id (§4.5 step 3:
    /// "Handle is stubbed to repo-id; the identity handler will correct
    /// it."). Conflict-do-nothing to tolerate races with the identity
    /// handler or a concurrent dispatch of another record by the same
    /// author.
    pub async fn insert_user_stub(
        &self,
        repo_id: &str,
        account_created_at: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO users (repo_id, handle, account_created_at, first_seen_at, last_active_at)
             VALUES ($1, $1, $2, $3, $3)
             ON CONFLICT (repo_id) DO NOTHING",
        )
        .bind(repo_id)
        .bind(account_created_at)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Back-fill `account_created_at` for a user row that exists without it
    /// (§4.5 step 2).
    pub async fn backfill_account_created_at(
        &self,
        repo_id: &str,
        account_created_at: OffsetDateTime,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE users SET account_created_at = $2
             WHERE repo_id = $1 AND account_created_at IS NULL",
        )
        .bind(repo_id)
        .bind(account_created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// `active` identity event: upsert the user row's handle and bump
    /// `last_active_at` (§4.4).
    pub async fn upsert_user_active(
        &self,
        repo_id: &str,
        handle: &str,
        now: OffsetDateTime,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO users (repo_id, handle, first_seen_at, last_active_at)
             VALUES ($1, $2, $3, $3)
             ON CONFLICT (repo_id) DO UPDATE SET handle = EXCLUDED.handle, last_active_at = EXCLUDED.last_active_at",
        )
        .bind(repo_id)
        .bind(handle)
        .bind(now)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn touch_last_active(&self, repo_id: &str, now: OffsetDateTime) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_active_at = $2 WHERE repo_id = $1")
            .bind(repo_id)
            .bind(now)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn set_role(&self, repo_id: &str, role: Role) -> DbResult<()> {
        sqlx::query("UPDATE users SET role = $2 WHERE repo_id = $1")
            .bind(repo_id)
            .bind(role)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// `deleted` identity event: purge every record authored by `repo_id`
    /// plus the user row and tracked-repo entry, in one transaction, leaves
    /// first (§4.4: "delete reactions, replies, topics, user row, and
    /// tracked-repo entry for this repo-id, in that order"). Aggregate
    /// counts on the author's ex-targets are *not* repaired — a documented
    /// limitation (§9 "Soft vs hard deletes").
    pub async fn purge_user(&self, repo_id: &str) -> DbResult<()> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM reactions WHERE author_repo_id = $1")
            .bind(repo_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM replies WHERE author_repo_id = $1")
            .bind(repo_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM topics WHERE author_repo_id = $1")
            .bind(repo_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE repo_id = $1")
            .bind(repo_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM tracked_repos WHERE repo_id = $1")
            .bind(repo_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
