//! Key-value backed session and token authority (§4.9, §6.3).
//!
//! Mirrors `tower-sessions-redb-store`'s shape — a thin wrapper type
//! around a connection handle, newtypes for the things that must never
//! be confused with a raw string — but targets Redis instead of an embedded
//! `redb`, since these stores are shared across every forum-server process
//! behind a load balancer rather than owned by one.

mod access_token;
mod oauth_state;
mod ozone_cache;
mod session;

pub use access_token::AccessToken;
pub use oauth_state::OAuthState;
pub use session::{Session, SessionId};

use std::result;

use redis::AsyncCommands as _;
use redis::aio::ConnectionManager;
use snafu::{ResultExt as _, Snafu};

const LOG_TARGET: &str = "forum::kv";

#[derive(Debug, Snafu)]
pub enum KvError {
    #[snafu(display("Failed to connect to the key-value store: {source}"))]
    Connect { source: redis::RedisError },
    #[snafu(display("Key-value store transport error: {source}"))]
    Transport { source: redis::RedisError },
    #[snafu(display("Failed to (de)serialize a key-value store value: {source}"))]
    Codec { source: serde_json::Error },
}

pub type KvResult<T> = result::Result<T, KvError>;

/// Handle to the Redis-backed KV store. Cheaply `Clone`-able (the connection
/// manager reconnects transparently and can be shared across tasks).
#[derive(Clone)]
pub struct KvStore {
    conn: ConnectionManager,
}

impl KvStore {
    pub async fn connect(redis_url: &str) -> KvResult<Self> {
        let client = redis::Client::open(redis_url).context(ConnectSnafu)?;
        let conn = client
            .get_connection_manager()
            .await
            .context(ConnectSnafu)?;
        Ok(Self { conn })
    }

    async fn set_json<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> KvResult<()> {
        let payload = serde_json::to_string(value).context(CodecSnafu)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, payload, ttl_secs)
            .await
            .context(TransportSnafu)?;
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> KvResult<Option<T>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await.context(TransportSnafu)?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw).context(CodecSnafu)?)),
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> KvResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.context(TransportSnafu)?;
        Ok(())
    }
}
