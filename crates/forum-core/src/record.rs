use serde::{Deserialize, Serialize};

/// A reference to another record by URI + content hash (§6.1 `root`/`parent`/
/// `subject`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

/// `forum.<ns>.topic.post` record payload (§6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicPostRecord {
    pub title: String,
    pub content: String,
    #[serde(rename = "contentFormat", default)]
    pub content_format: Option<String>,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub community: String,
    #[serde(default)]
    pub labels: Option<Labels>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// `forum.<ns>.topic.reply` record payload (§6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicReplyRecord {
    pub content: String,
    #[serde(rename = "contentFormat", default)]
    pub content_format: Option<String>,
    pub root: StrongRef,
    pub parent: StrongRef,
    pub community: String,
    #[serde(default)]
    pub labels: Option<Labels>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// `forum.<ns>.interaction.reaction` record payload (§6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub subject: StrongRef,
    #[serde(rename = "type")]
    pub reaction_type: String,
    pub community: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    pub values: Vec<LabelValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelValue {
    pub val: String,
}
