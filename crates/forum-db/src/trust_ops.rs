//! Trust seeds and persisted trust scores (§3, §4.10).

use time::OffsetDateTime;

use crate::models::TrustScoreRow;
use crate::{DbResult, Database};

/// Default returned by `get_trust_score` when no score has been computed
/// yet for (id, scope) — see §4.10 "getTrustScore".
pub const DEFAULT_TRUST_SCORE: f64 = 0.1;

impl Database {
    pub async fn add_trust_seed(&self, repo_id: &str, scope: &str) -> DbResult<()> {
        sqlx::query("INSERT INTO trust_seeds (repo_id, scope) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(repo_id)
            .bind(scope)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Configured seeds for a scope, plus all admins/moderators (§4.10:
    /// "Seed set S: union of configured seeds for the scope and all users
    /// with role in {admin, moderator}").
    pub async fn load_seed_set(&self, scope: &str) -> DbResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT repo_id FROM trust_seeds WHERE scope = $1
             UNION
             SELECT repo_id FROM users WHERE role IN ('admin', 'moderator')",
        )
        .bind(scope)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn upsert_trust_score(
        &self,
        repo_id: &str,
        scope: &str,
        score: f64,
        computed_at: OffsetDateTime,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO trust_scores (repo_id, scope, score, computed_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (repo_id, scope) DO UPDATE SET score = EXCLUDED.score, computed_at = EXCLUDED.computed_at",
        )
        .bind(repo_id)
        .bind(scope)
        .bind(score)
        .bind(computed_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_trust_score(&self, repo_id: &str, scope: &str) -> DbResult<f64> {
        let row: Option<(f64,)> =
            sqlx::query_as("SELECT score FROM trust_scores WHERE repo_id = $1 AND scope = $2")
                .bind(repo_id)
                .bind(scope)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.map(|(s,)| s).unwrap_or(DEFAULT_TRUST_SCORE))
    }

    pub async fn load_all_scores(&self, scope: &str) -> DbResult<Vec<TrustScoreRow>> {
        let rows = sqlx::query_as::<_, TrustScoreRow>(
            "SELECT * FROM trust_scores WHERE scope = $1",
        )
        .bind(scope)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[sqlx::test]
    async fn missing_score_defaults_to_point_one(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        assert_eq!(db.get_trust_score("did:plc:a", "").await.unwrap(), 0.1);
    }

    #[sqlx::test]
    async fn seed_set_includes_admins_and_moderators(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        db.insert_user_stub("admin1", None, now).await.unwrap();
        db.set_role("admin1", forum_core::Role::Admin).await.unwrap();
        db.insert_user_stub("mod1", None, now).await.unwrap();
        db.set_role("mod1", forum_core::Role::Moderator).await.unwrap();
        db.insert_user_stub("user1", None, now).await.unwrap();
        db.add_trust_seed("seed1", "").await.unwrap();

        let mut seeds = db.load_seed_set("").await.unwrap();
        seeds.sort();
        assert_eq!(seeds, vec!["admin1", "mod1", "seed1"]);
    }
}
