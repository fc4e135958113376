//! Moderation actions and ban propagation (§4.13 "Ban propagation").
//!
//! A per-community ban/unban log feeds a global `account_filters` row: once
//! a repo-id has accumulated bans in `BAN_PROPAGATION_THRESHOLD` distinct
//! communities, it is filtered globally.

use time::OffsetDateTime;

use crate::models::AccountFilterRow;
use crate::{DbResult, Database};

/// §4.13: "a repo-id banned in >= 2 distinct communities is filtered
/// globally".
pub const BAN_PROPAGATION_THRESHOLD: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModAction {
    Ban,
    Unban,
}

impl ModAction {
    fn as_str(self) -> &'static str {
        match self {
            ModAction::Ban => "ban",
            ModAction::Unban => "unban",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalFilterOutcome {
    /// Ban count stayed below the propagation threshold.
    NotFiltered,
    /// This action pushed (or kept) the repo-id at/above the threshold.
    Filtered,
}

impl Database {
    /// Record a per-community mod action and recompute the repo-id's global
    /// filter status from its distinct-community ban count.
    pub async fn record_mod_action(
        &self,
        target_repo_id: &str,
        community_id: &str,
        action: ModAction,
        now: OffsetDateTime,
    ) -> DbResult<GlobalFilterOutcome> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO mod_actions (target_repo_id, community_id, action, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(target_repo_id)
        .bind(community_id)
        .bind(action.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Distinct communities where the most recent mod action for this
        // repo-id is a ban (an unban in a community removes it from the
        // count without needing to delete history).
        let (ban_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM (
                SELECT DISTINCT ON (community_id) community_id, action
                FROM mod_actions
                WHERE target_repo_id = $1
                ORDER BY community_id, created_at DESC
             ) latest
             WHERE latest.action = 'ban'",
        )
        .bind(target_repo_id)
        .fetch_one(&mut *tx)
        .await?;

        let status = if ban_count >= BAN_PROPAGATION_THRESHOLD {
            "filtered"
        } else {
            "clear"
        };

        sqlx::query(
            "INSERT INTO account_filters (repo_id, status, ban_count, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (repo_id) DO UPDATE SET
                status = EXCLUDED.status, ban_count = EXCLUDED.ban_count, updated_at = EXCLUDED.updated_at",
        )
        .bind(target_repo_id)
        .bind(status)
        .bind(ban_count as i32)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(if ban_count >= BAN_PROPAGATION_THRESHOLD {
            GlobalFilterOutcome::Filtered
        } else {
            GlobalFilterOutcome::NotFiltered
        })
    }

    pub async fn get_account_filter(&self, repo_id: &str) -> DbResult<Option<AccountFilterRow>> {
        let row = sqlx::query_as::<_, AccountFilterRow>(
            "SELECT * FROM account_filters WHERE repo_id = $1",
        )
        .bind(repo_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn is_globally_filtered(&self, repo_id: &str) -> DbResult<bool> {
        Ok(self
            .get_account_filter(repo_id)
            .await?
            .is_some_and(|row| row.status == "filtered"))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[sqlx::test]
    async fn single_community_ban_does_not_propagate(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        let outcome = db
            .record_mod_action("did:plc:a", "community-1", ModAction::Ban, now)
            .await
            .unwrap();
        assert_eq!(outcome, GlobalFilterOutcome::NotFiltered);
        assert!(!db.is_globally_filtered("did:plc:a").await.unwrap());
    }

    #[sqlx::test]
    async fn two_distinct_community_bans_propagate_globally(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        db.record_mod_action("did:plc:a", "community-1", ModAction::Ban, now)
            .await
            .unwrap();
        let outcome = db
            .record_mod_action("did:plc:a", "community-2", ModAction::Ban, now)
            .await
            .unwrap();
        assert_eq!(outcome, GlobalFilterOutcome::Filtered);
        assert!(db.is_globally_filtered("did:plc:a").await.unwrap());
    }

    #[sqlx::test]
    async fn unban_in_one_community_drops_below_threshold(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        db.record_mod_action("did:plc:a", "community-1", ModAction::Ban, now)
            .await
            .unwrap();
        db.record_mod_action("did:plc:a", "community-2", ModAction::Ban, now)
            .await
            .unwrap();
        assert!(db.is_globally_filtered("did:plc:a").await.unwrap());

        db.record_mod_action("did:plc:a", "community-1", ModAction::Unban, now)
            .await
            .unwrap();
        assert!(!db.is_globally_filtered("did:plc:a").await.unwrap());
    }
}
