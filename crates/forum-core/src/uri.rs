use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snafu::{OptionExt as _, Snafu};

/// A content-addressed record identifier: `at://<repo-id>/<collection>/<record-key>`.
///
/// `repo-id` is an opaque identity string, `collection` a reverse-DNS
/// namespace, `record-key` an opaque key. Two distinct entities never share
/// a URI (§3 "Invariants").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordUri {
    repo_id: String,
    collection: String,
    record_key: String,
}

#[derive(Debug, Snafu)]
pub enum UriParseError {
    #[snafu(display("URI {uri:?} is missing the at:// scheme"))]
    MissingScheme { uri: String },
    #[snafu(display("URI {uri:?} does not have repo-id/collection/record-key segments"))]
    MalformedPath { uri: String },
}

impl RecordUri {
    pub fn new(
        repo_id: impl Into<String>,
        collection: impl Into<String>,
        record_key: impl Into<String>,
    ) -> Self {
        Self {
            repo_id: repo_id.into(),
            collection: collection.into(),
            record_key: record_key.into(),
        }
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn record_key(&self) -> &str {
        &self.record_key
    }
}

impl fmt::Display for RecordUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "at://{}/{}/{}",
            self.repo_id, self.collection, self.record_key
        )
    }
}

impl FromStr for RecordUri {
    type Err = UriParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("at://").context(MissingSchemeSnafu { uri: s })?;
        let mut parts = rest.splitn(3, '/');
        let (Some(repo_id), Some(collection), Some(record_key)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return MalformedPathSnafu { uri: s }.fail();
        };
        if repo_id.is_empty() || collection.is_empty() || record_key.is_empty() {
            return MalformedPathSnafu { uri: s }.fail();
        }
        Ok(Self::new(repo_id, collection, record_key))
    }
}

impl TryFrom<String> for RecordUri {
    type Error = UriParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordUri> for String {
    fn from(value: RecordUri) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_display_and_parse() {
        let uri = RecordUri::new("did:plc:abc123", "forum.x.topic.post", "3jui7");
        let s = uri.to_string();
        assert_eq!(s, "at://did:plc:abc123/forum.x.topic.post/3jui7");
        assert_eq!(s.parse::<RecordUri>().unwrap(), uri);
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(matches!(
            "did:plc:abc/forum.x.topic.post/3jui7".parse::<RecordUri>(),
            Err(UriParseError::MissingScheme { .. })
        ));
    }

    #[test]
    fn rejects_too_few_segments() {
        assert!(matches!(
            "at://did:plc:abc/forum.x.topic.post".parse::<RecordUri>(),
            Err(UriParseError::MalformedPath { .. })
        ));
    }

    #[test]
    fn record_key_may_contain_slashes_in_upstream_opaque_keys() {
        // record-key is documented opaque; splitn(3) keeps any remaining
        // slashes as part of it rather than truncating.
        let uri: RecordUri = "at://did:plc:abc/forum.x.topic.post/a/b"
            .parse()
            .unwrap();
        assert_eq!(uri.record_key(), "a/b");
    }
}
