//! Behavioral heuristic flags (§4.12 "Behavioral heuristics"). The
//! heuristics (burst voting, content similarity, low reaction diversity)
//! run in `forum-reputation`; this module just records what they find.

use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct BehavioralFlagRow {
    pub id: i64,
    pub flag_type: String,
    pub affected_ids: Vec<String>,
    pub details: Value,
    pub detected_at: OffsetDateTime,
}

use crate::{DbResult, Database};

impl Database {
    pub async fn insert_behavioral_flag(
        &self,
        flag_type: &str,
        affected_ids: &[String],
        details: &Value,
        detected_at: OffsetDateTime,
    ) -> DbResult<i64> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO behavioral_flags (flag_type, affected_ids, details, detected_at)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(flag_type)
        .bind(affected_ids)
        .bind(details)
        .bind(detected_at)
        .fetch_one(self.pool())
        .await?;
        Ok(id)
    }

    pub async fn list_behavioral_flags_for(&self, repo_id: &str) -> DbResult<Vec<BehavioralFlagRow>> {
        let rows = sqlx::query_as::<_, BehavioralFlagRow>(
            "SELECT * FROM behavioral_flags WHERE $1 = ANY(affected_ids) ORDER BY detected_at DESC",
        )
        .bind(repo_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    #[sqlx::test]
    async fn insert_then_query_by_affected_id(pool: sqlx::PgPool) {
        let db = Database::from_pool(pool);
        let now = datetime!(2026-07-30 12:00 UTC);
        db.insert_behavioral_flag(
            "burst_voting",
            &["did:plc:a".to_string()],
            &json!({"window_secs": 600, "count": 25}),
            now,
        )
        .await
        .unwrap();

        let flags = db.list_behavioral_flags_for("did:plc:a").await.unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].flag_type, "burst_voting");

        assert!(db.list_behavioral_flags_for("did:plc:b").await.unwrap().is_empty());
    }
}
