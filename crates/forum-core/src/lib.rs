//! Wire shapes and collection registry shared by every part of the forum
//! backend.
//!
//! This crate has no I/O of its own: it is the boundary vocabulary the
//! ingestion pipeline, indexers, and reputation engine all speak so that
//! none of them need to know about the upstream event stream's exact wire
//! format (see `forum-ingest` for the stream client, `forum-db` for
//! storage).

mod collection;
mod domain;
mod event;
mod record;
mod uri;

pub use collection::CollectionNsid;
pub use domain::*;
pub use event::{IdentityEvent, IdentityStatus, RecordAction, RecordEvent};
pub use record::{Labels, ReactionRecord, StrongRef, TopicPostRecord, TopicReplyRecord};
pub use uri::{RecordUri, UriParseError};
