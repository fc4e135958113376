//! Ban propagation orchestration (§4.13). `forum-db` records mod actions and
//! `forum-kv` caches account-filter status, but neither crate depends on the
//! other — this is the seam where both are available, so it is where the
//! two halves of the contract ("upsert the global filter row" and
//! "invalidate `account-filter:<id>`") are wired into one behavior.

use forum_db::mod_action_ops::{GlobalFilterOutcome, ModAction};
use time::OffsetDateTime;
use tracing::warn;

use crate::state::AppState;

const LOG_TARGET: &str = "forum::web::moderation";

/// Record a ban/unban and invalidate the account-filter cache entry it may
/// have changed. The cache invalidation is best-effort: per §4.13, "cache
/// errors are non-fatal", so a KV failure is logged and the mod action
/// still stands.
pub async fn apply_mod_action(
    state: &AppState,
    target_repo_id: &str,
    community_id: &str,
    action: ModAction,
    now: OffsetDateTime,
) -> forum_db::DbResult<GlobalFilterOutcome> {
    let outcome = state
        .db
        .record_mod_action(target_repo_id, community_id, action, now)
        .await?;

    if let Err(err) = state.kv.invalidate_account_filter(target_repo_id).await {
        warn!(
            target: LOG_TARGET,
            repo_id = %target_repo_id,
            error = %err,
            "account-filter cache invalidation failed, cache will serve a stale entry until its TTL expires"
        );
    }

    Ok(outcome)
}
