//! OAuth state store (§4.9 "OAuth state store", §6.3 `oauth:state:<key>`).
//!
//! Bridges the redirect → callback hop of the authorization-code flow. The
//! key is a random nonce handed to the identity provider as the `state`
//! query parameter; the value carries whatever this side needs to resume
//! the flow on callback.

use serde::{Deserialize, Serialize};

use crate::{KvResult, KvStore};

const TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    pub pkce_verifier: String,
    pub redirect_uri: String,
}

fn key(state_key: &str) -> String {
    format!("oauth:state:{state_key}")
}

impl KvStore {
    pub async fn set_oauth_state(&self, state_key: &str, state: &OAuthState) -> KvResult<()> {
        self.set_json(&key(state_key), state, TTL_SECS).await
    }

    pub async fn get_oauth_state(&self, state_key: &str) -> KvResult<Option<OAuthState>> {
        self.get_json(&key(state_key)).await
    }

    pub async fn delete_oauth_state(&self, state_key: &str) -> KvResult<()> {
        self.del(&key(state_key)).await
    }
}
