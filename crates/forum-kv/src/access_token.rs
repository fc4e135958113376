//! Access-token map (§4.9 "Access-token map", §6.3 no explicit key prefix
//! given for this one; `token:<token>` is used here to keep it distinct
//! from the `oauth:` namespace, which is reserved for the redirect flow).

use rand::Rng as _;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::{KvResult, KvStore};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new_random() -> Self {
        let token = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn key(token: &str) -> String {
    format!("token:{token}")
}

impl KvStore {
    pub async fn create_access_token(
        &self,
        repo_id: &str,
        ttl_secs: u64,
    ) -> KvResult<AccessToken> {
        let token = AccessToken::new_random();
        self.set_json(&key(token.as_str()), &repo_id.to_string(), ttl_secs)
            .await?;
        Ok(token)
    }

    /// §4.9: "returns null on miss/expiry, raises only on KV transport
    /// error". A miss at either hop (token → repo-id, repo-id → session)
    /// is folded into `Ok(None)`; only a transport error at either hop
    /// propagates.
    pub async fn validate_access_token(&self, token: &str) -> KvResult<Option<Session>> {
        let repo_id: Option<String> = self.get_json(&key(token)).await?;
        let Some(repo_id) = repo_id else {
            return Ok(None);
        };
        self.get_session(&repo_id).await
    }

    pub async fn revoke_access_token(&self, token: &str) -> KvResult<()> {
        self.del(&key(token)).await
    }
}
