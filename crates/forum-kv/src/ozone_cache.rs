//! Label and account-filter caches (§6.3 `ozone:labels:<uri>` and
//! `account-filter:<id>`). Both are opaque caches over values computed
//! elsewhere (an external moderation service, and `forum-db`'s ban
//! propagation) — this module only owns get/set/invalidate.

use crate::{KvResult, KvStore};

const LABELS_TTL_SECS: u64 = 3600;

fn labels_key(uri: &str) -> String {
    format!("ozone:labels:{uri}")
}

fn account_filter_key(repo_id: &str) -> String {
    format!("account-filter:{repo_id}")
}

impl KvStore {
    pub async fn get_cached_labels(&self, uri: &str) -> KvResult<Option<Vec<String>>> {
        self.get_json(&labels_key(uri)).await
    }

    pub async fn set_cached_labels(&self, uri: &str, labels: &[String]) -> KvResult<()> {
        self.set_json(&labels_key(uri), &labels.to_vec(), LABELS_TTL_SECS)
            .await
    }

    pub async fn get_cached_account_filter(&self, repo_id: &str) -> KvResult<Option<String>> {
        self.get_json(&account_filter_key(repo_id)).await
    }

    pub async fn set_cached_account_filter(&self, repo_id: &str, status: &str) -> KvResult<()> {
        // No TTL in §6.3 for this key; it lives until explicitly invalidated
        // by a mod action, so a long TTL stands in for "no expiry" while
        // still bounding unbounded growth from repo-ids that are never
        // banned again.
        self.set_json(&account_filter_key(repo_id), &status.to_string(), 86_400)
            .await
    }

    /// §4.13: "invalidate the cache key `account-filter:<id>` (cache
    /// errors are non-fatal)". Callers should log and continue on `Err`
    /// rather than fail the mod action.
    pub async fn invalidate_account_filter(&self, repo_id: &str) -> KvResult<()> {
        self.del(&account_filter_key(repo_id)).await
    }
}
