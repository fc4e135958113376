//! Record validator (§4.2). Size cap plus a per-collection required-field
//! check; this is a shape check, not a full schema validator — the lexicon
//! (§6.1) only enumerates required fields and their coarse JSON types.

use forum_core::CollectionNsid;
use serde_json::Value;
use snafu::Snafu;
use unicode_segmentation::UnicodeSegmentation as _;

const MAX_RECORD_BYTES: usize = 64 * 1024;
const MAX_REACTION_TYPE_GRAPHEMES: usize = 30;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ValidationError {
    #[snafu(display("unsupported collection: {nsid}"))]
    UnsupportedCollection { nsid: String },
    #[snafu(display("record exceeds {MAX_RECORD_BYTES} bytes"))]
    TooLarge,
    #[snafu(display("missing or malformed required field: {field}"))]
    MissingField { field: String },
}

pub fn validate(nsid: &str, record: &Value) -> Result<CollectionNsid, ValidationError> {
    let collection = CollectionNsid::from_nsid(nsid).ok_or_else(|| ValidationError::UnsupportedCollection {
        nsid: nsid.to_string(),
    })?;

    let serialized = serde_json::to_vec(record).unwrap_or_default();
    if serialized.len() > MAX_RECORD_BYTES {
        return Err(ValidationError::TooLarge);
    }

    let required_fields: &[&str] = match collection {
        CollectionNsid::TopicPost => &["title", "content", "category", "community", "createdAt"],
        CollectionNsid::TopicReply => &["content", "root", "parent", "community", "createdAt"],
        CollectionNsid::Reaction => &["subject", "type", "community", "createdAt"],
    };

    for field in required_fields {
        if record.get(*field).is_none_or(Value::is_null) {
            return Err(ValidationError::MissingField {
                field: field.to_string(),
            });
        }
    }

    if matches!(collection, CollectionNsid::TopicReply) {
        for strong_ref_field in ["root", "parent"] {
            let Some(strong_ref) = record.get(strong_ref_field) else {
                continue;
            };
            if strong_ref.get("uri").and_then(Value::as_str).is_none()
                || strong_ref.get("cid").and_then(Value::as_str).is_none()
            {
                return Err(ValidationError::MissingField {
                    field: format!("{strong_ref_field}.uri/cid"),
                });
            }
        }
    }
    if matches!(collection, CollectionNsid::Reaction) {
        let subject = record.get("subject");
        if subject.and_then(|s| s.get("uri")).and_then(Value::as_str).is_none()
            || subject.and_then(|s| s.get("cid")).and_then(Value::as_str).is_none()
        {
            return Err(ValidationError::MissingField {
                field: "subject.uri/cid".to_string(),
            });
        }
        // §8 boundary: reaction type is capped at 30 graphemes, not bytes or chars.
        let reaction_type = record.get("type").and_then(Value::as_str).unwrap_or_default();
        if reaction_type.graphemes(true).count() > MAX_REACTION_TYPE_GRAPHEMES {
            return Err(ValidationError::MissingField {
                field: "type".to_string(),
            });
        }
    }

    Ok(collection)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unsupported_collection_is_rejected() {
        let err = validate("forum.x.something.else", &json!({})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedCollection {
                nsid: "forum.x.something.else".to_string()
            }
        );
    }

    #[test]
    fn oversized_record_is_rejected() {
        let huge = "a".repeat(70 * 1024);
        let record = json!({
            "title": "t", "content": huge, "category": "general", "community": "",
            "createdAt": "2026-07-30T00:00:00Z",
        });
        assert_eq!(validate("forum.x.topic.post", &record).unwrap_err(), ValidationError::TooLarge);
    }

    #[test]
    fn valid_topic_post_passes() {
        let record = json!({
            "title": "t", "content": "c", "category": "general", "community": "",
            "createdAt": "2026-07-30T00:00:00Z",
        });
        assert_eq!(validate("forum.x.topic.post", &record).unwrap(), CollectionNsid::TopicPost);
    }

    #[test]
    fn reply_missing_root_uri_is_rejected() {
        let record = json!({
            "content": "c",
            "root": {"cid": "bafy1"},
            "parent": {"uri": "at://a/forum.x.topic.post/1", "cid": "bafy1"},
            "community": "",
            "createdAt": "2026-07-30T00:00:00Z",
        });
        assert!(matches!(
            validate("forum.x.topic.reply", &record),
            Err(ValidationError::MissingField { .. })
        ));
    }

    #[test]
    fn reaction_requires_subject_strong_ref() {
        let record = json!({
            "subject": {"uri": "at://a/forum.x.topic.post/1"},
            "type": "like",
            "community": "",
            "createdAt": "2026-07-30T00:00:00Z",
        });
        assert!(matches!(
            validate("forum.x.interaction.reaction", &record),
            Err(ValidationError::MissingField { .. })
        ));
    }

    fn reaction_record(reaction_type: &str) -> serde_json::Value {
        json!({
            "subject": {"uri": "at://a/forum.x.topic.post/1", "cid": "bafy1"},
            "type": reaction_type,
            "community": "",
            "createdAt": "2026-07-30T00:00:00Z",
        })
    }

    #[test]
    fn reaction_type_of_exactly_30_graphemes_is_accepted() {
        let reaction_type = "a".repeat(30);
        let record = reaction_record(&reaction_type);
        assert_eq!(
            validate("forum.x.interaction.reaction", &record).unwrap(),
            CollectionNsid::Reaction
        );
    }

    #[test]
    fn reaction_type_of_31_graphemes_is_rejected() {
        let reaction_type = "a".repeat(31);
        let record = reaction_record(&reaction_type);
        assert_eq!(
            validate("forum.x.interaction.reaction", &record).unwrap_err(),
            ValidationError::MissingField { field: "type".to_string() }
        );
    }
}
