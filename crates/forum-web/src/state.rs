//! Shared process state handed to every route (§6.6 process configuration).

use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunityMode {
    Single,
    Global,
}

#[derive(Clone)]
pub struct AppState {
    pub db: forum_db::Database,
    pub kv: forum_kv::KvStore,
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    community_mode: CommunityMode,
    operator_ids: HashSet<String>,
}

impl AppState {
    pub fn new(
        db: forum_db::Database,
        kv: forum_kv::KvStore,
        community_mode: CommunityMode,
        operator_ids: HashSet<String>,
    ) -> Self {
        Self {
            db,
            kv,
            inner: Arc::new(AppStateInner {
                community_mode,
                operator_ids,
            }),
        }
    }

    pub fn community_mode(&self) -> CommunityMode {
        self.inner.community_mode
    }

    pub fn is_operator(&self, repo_id: &str) -> bool {
        self.inner.operator_ids.contains(repo_id)
    }
}
