//! OAuth session store (§4.9 "OAuth session store", §6.3 `oauth:session:<id>`).
//!
//! Keyed by the authenticated repo-id, per §4.9's component description —
//! one live session per identity. The opaque [`SessionId`] carried inside
//! the stored value is what `requireAuth` attaches to the request; it is
//! never itself a lookup key, only an identifier surfaced to the caller.

use rand::Rng as _;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{KvResult, KvStore};

/// Opaque per-login identifier, distinct from the repo-id used as the
/// storage key. Mirrors `rostra-web-ui`'s `SessionToken` newtype: a thin
/// wrapper that exists only so a raw string can't be substituted by
/// accident at a call site expecting a validated session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(u128);

impl SessionId {
    pub fn new_random() -> Self {
        Self(rand::rng().random())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub repo_id: String,
    pub handle: String,
    pub scopes: Vec<String>,
    pub expires_at: OffsetDateTime,
}

fn key(repo_id: &str) -> String {
    format!("oauth:session:{repo_id}")
}

impl KvStore {
    pub async fn set_session(&self, session: &Session, ttl_secs: u64) -> KvResult<()> {
        self.set_json(&key(&session.repo_id), session, ttl_secs)
            .await
    }

    pub async fn get_session(&self, repo_id: &str) -> KvResult<Option<Session>> {
        self.get_json(&key(repo_id)).await
    }

    pub async fn delete_session(&self, repo_id: &str) -> KvResult<()> {
        self.del(&key(repo_id)).await
    }
}
