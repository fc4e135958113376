//! Typed rows for the tables defined in `migrations/0001_init.sql`.

use forum_core::{ClusterStatus, InteractionKind, MemberRole, ModerationStatus, Role, TrustStatus};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub repo_id: String,
    pub handle: String,
    pub role: Role,
    pub banned: bool,
    pub reputation_score: f64,
    pub first_seen_at: OffsetDateTime,
    pub last_active_at: OffsetDateTime,
    pub account_created_at: Option<OffsetDateTime>,
    pub declared_age: Option<String>,
    pub maturity_preference: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TopicRow {
    pub uri: String,
    pub record_key: String,
    pub author_repo_id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub community_id: String,
    pub cid: String,
    pub self_labels: Vec<String>,
    pub reply_count: i64,
    pub reaction_count: i64,
    pub last_activity_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub indexed_at: OffsetDateTime,
    pub trust_status: TrustStatus,
    pub moderation_status: ModerationStatus,
    pub author_deleted: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ReplyRow {
    pub uri: String,
    pub record_key: String,
    pub author_repo_id: String,
    pub content: String,
    pub root_uri: String,
    pub root_cid: String,
    pub parent_uri: String,
    pub parent_cid: String,
    pub community_id: String,
    pub reaction_count: i64,
    pub trust_status: TrustStatus,
    pub moderation_status: ModerationStatus,
    pub created_at: OffsetDateTime,
    pub indexed_at: OffsetDateTime,
    pub author_deleted: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ReactionRow {
    pub uri: String,
    pub author_repo_id: String,
    pub subject_uri: String,
    pub subject_cid: String,
    pub reaction_type: String,
    pub community_id: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct InteractionEdgeRow {
    pub source_repo_id: String,
    pub target_repo_id: String,
    pub community_id: String,
    pub kind: InteractionKind,
    pub weight: i64,
    pub first_seen_at: OffsetDateTime,
    pub last_seen_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TrustScoreRow {
    pub repo_id: String,
    pub scope: String,
    pub score: f64,
    pub computed_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SybilClusterRow {
    pub cluster_hash: String,
    pub scope: String,
    pub internal_edges: i64,
    pub external_edges: i64,
    pub member_count: i32,
    pub status: ClusterStatus,
    pub detected_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SybilClusterMemberRow {
    pub cluster_hash: String,
    pub repo_id: String,
    pub role: MemberRole,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AccountFilterRow {
    pub repo_id: String,
    pub status: String,
    pub ban_count: i32,
    pub updated_at: OffsetDateTime,
}
