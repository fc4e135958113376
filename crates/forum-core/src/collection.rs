use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three collection NSIDs this system indexes (§4.5 "Dispatch table").
///
/// Matching is on the namespace-qualified suffix (`topic.post`, `topic.reply`,
/// `interaction.reaction`) so that any `forum.<ns>.*` namespace is accepted;
/// anything else is an unknown collection and silently ignored by the
/// dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionNsid {
    TopicPost,
    TopicReply,
    Reaction,
}

impl CollectionNsid {
    /// Parse a collection NSID string (e.g. `forum.barazo.topic.post`) into
    /// the registry entry handling it, or `None` for unknown collections.
    pub fn from_nsid(nsid: &str) -> Option<Self> {
        if nsid.ends_with(".topic.post") {
            Some(Self::TopicPost)
        } else if nsid.ends_with(".topic.reply") {
            Some(Self::TopicReply)
        } else if nsid.ends_with(".interaction.reaction") {
            Some(Self::Reaction)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopicPost => "topic.post",
            Self::TopicReply => "topic.reply",
            Self::Reaction => "interaction.reaction",
        }
    }
}

impl fmt::Display for CollectionNsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionNsid {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_nsid(s).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_any_namespace() {
        assert_eq!(
            CollectionNsid::from_nsid("forum.barazo.topic.post"),
            Some(CollectionNsid::TopicPost)
        );
        assert_eq!(
            CollectionNsid::from_nsid("forum.otherforum.topic.reply"),
            Some(CollectionNsid::TopicReply)
        );
        assert_eq!(
            CollectionNsid::from_nsid("forum.x.interaction.reaction"),
            Some(CollectionNsid::Reaction)
        );
    }

    #[test]
    fn unknown_collections_are_none() {
        assert_eq!(CollectionNsid::from_nsid("app.bsky.feed.post"), None);
        assert_eq!(CollectionNsid::from_nsid("forum.x.moderation.action"), None);
    }
}
