//! Account-age oracle (§4.6). Resolves an account's creation time from the
//! external directory and classifies trust status from it. Fails open:
//! every error path returns `None`/`Trusted` rather than blocking ingestion.

use std::time::Duration;

use forum_core::TrustStatus;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::warn;

const LOG_TARGET: &str = "forum::ingest::account_age";
const ORACLE_TIMEOUT: Duration = Duration::from_secs(5);
const NEW_ACCOUNT_WINDOW: time::Duration = time::Duration::hours(24);

pub struct AccountAgeOracle {
    client: reqwest::Client,
    directory_url: String,
}

impl AccountAgeOracle {
    pub fn new(directory_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(ORACLE_TIMEOUT)
            .build()
            .expect("reqwest client builder with only a timeout never fails");
        Self { client, directory_url }
    }

    /// `resolveCreationDate` (§4.6). Returns `None` on timeout, non-2xx,
    /// malformed payload, or an empty audit log.
    pub async fn resolve_creation_date(&self, repo_id: &str) -> Option<OffsetDateTime> {
        let url = format!(
            "{}/{}/log/audit",
            self.directory_url.trim_end_matches('/'),
            urlencoding::encode(repo_id)
        );
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(target: LOG_TARGET, repo_id, error = %err, "directory fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(target: LOG_TARGET, repo_id, status = %response.status(), "directory returned non-2xx");
            return None;
        }
        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                warn!(target: LOG_TARGET, repo_id, error = %err, "directory payload was not valid JSON");
                return None;
            }
        };
        let first = body.as_array().and_then(|entries| entries.first())?;
        let created_at = first.get("createdAt").and_then(Value::as_str)?;
        OffsetDateTime::parse(created_at, &time::format_description::well_known::Rfc3339).ok()
    }
}

/// `determineTrustStatus` (§4.6): `new` iff the account is known to be
/// less than 24h old; unknown age fails open to `trusted`.
pub fn determine_trust_status(created_at: Option<OffsetDateTime>, now: OffsetDateTime) -> TrustStatus {
    match created_at {
        Some(created_at) if now - created_at < NEW_ACCOUNT_WINDOW => TrustStatus::New,
        _ => TrustStatus::Trusted,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn unknown_age_is_trusted() {
        let now = datetime!(2026-07-30 0:00 UTC);
        assert_eq!(determine_trust_status(None, now), TrustStatus::Trusted);
    }

    #[test]
    fn account_created_minutes_ago_is_new() {
        let now = datetime!(2026-07-30 12:00 UTC);
        let created = now - time::Duration::hours(1);
        assert_eq!(determine_trust_status(Some(created), now), TrustStatus::New);
    }

    #[test]
    fn account_older_than_24h_is_trusted() {
        let now = datetime!(2026-07-30 12:00 UTC);
        let created = now - time::Duration::hours(25);
        assert_eq!(determine_trust_status(Some(created), now), TrustStatus::Trusted);
    }
}
