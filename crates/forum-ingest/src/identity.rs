//! Identity handler (§4.4). Consumes identity events carrying
//! (repo-id, handle, status).

use forum_core::{AccountStatus, IdentityEvent};
use time::OffsetDateTime;
use tracing::info;

const LOG_TARGET: &str = "forum::ingest::identity";

pub async fn handle_identity_event(
    db: &forum_db::Database,
    event: &IdentityEvent,
    now: OffsetDateTime,
) -> forum_db::DbResult<()> {
    match AccountStatus::from(event.status) {
        AccountStatus::Active => {
            db.upsert_user_active(&event.did, &event.handle, now).await?;
        }
        AccountStatus::Deleted => {
            db.purge_user(&event.did).await?;
        }
        other => {
            info!(target: LOG_TARGET, repo_id = %event.did, status = ?other, "identity event logged, no state change");
        }
    }
    Ok(())
}
