use serde::{Deserialize, Serialize};

use crate::AccountStatus;

/// A firehose record event (§6.1).
///
/// `record` is only present for `create`/`update`; a `delete` carries no
/// record body (see the reply-indexer root-URI note in `forum-db`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEvent {
    pub id: i64,
    pub action: RecordAction,
    pub did: String,
    pub rev: String,
    pub collection: String,
    pub rkey: String,
    pub record: Option<serde_json::Value>,
    pub cid: Option<String>,
    /// `true` for freshly observed events, `false` for backfill (§4.3
    /// "Timestamp clamp").
    pub live: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Create,
    Update,
    Delete,
}

/// A firehose identity event (§6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityEvent {
    pub id: i64,
    pub did: String,
    pub handle: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    pub status: IdentityStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStatus {
    Active,
    Takendown,
    Suspended,
    Deactivated,
    Deleted,
}

impl From<IdentityStatus> for AccountStatus {
    fn from(value: IdentityStatus) -> Self {
        match value {
            IdentityStatus::Active => AccountStatus::Active,
            IdentityStatus::Takendown => AccountStatus::Takendown,
            IdentityStatus::Suspended => AccountStatus::Suspended,
            IdentityStatus::Deactivated => AccountStatus::Deactivated,
            IdentityStatus::Deleted => AccountStatus::Deleted,
        }
    }
}
