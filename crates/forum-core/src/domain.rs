use serde::{Deserialize, Serialize};

/// Whether an author's account was judged `new` (< 24h old) or `trusted` at
/// the moment a record was indexed (§4.6). Stored on the record, not
/// recomputed later — trust status is a point-in-time tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trust_status", rename_all = "lowercase")]
pub enum TrustStatus {
    Trusted,
    New,
}

/// Moderation state of a topic or reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "moderation_status", rename_all = "lowercase")]
pub enum ModerationStatus {
    Approved,
    Held,
    Rejected,
}

impl Default for ModerationStatus {
    fn default() -> Self {
        Self::Approved
    }
}

/// A user's privilege level (§3 "User").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

/// Kind of a directed interaction edge in the reputation graph (§3
/// "Interaction edge").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "interaction_kind", rename_all = "kebab-case")]
pub enum InteractionKind {
    Reply,
    Reaction,
    TopicCoparticipation,
}

/// Moderation status of a detected sybil cluster (§3 "Sybil cluster").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cluster_status", rename_all = "lowercase")]
pub enum ClusterStatus {
    Flagged,
    Dismissed,
    Monitoring,
    Banned,
}

/// A cluster member's role within the detected subgraph (§4.11 step 5c).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cluster_member_role", rename_all = "lowercase")]
pub enum MemberRole {
    Core,
    Peripheral,
}

/// Lifecycle status carried by identity events (§4.4, §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Takendown,
    Suspended,
    Deactivated,
    Deleted,
}

/// The empty-string sentinel used for "global scope" everywhere a community
/// id is otherwise expected (§9 "Empty-string sentinel for global scope").
pub const GLOBAL_SCOPE: &str = "";

/// A scope is either a specific community id or the global sentinel.
pub fn is_global_scope(community_id: &str) -> bool {
    community_id == GLOBAL_SCOPE
}
