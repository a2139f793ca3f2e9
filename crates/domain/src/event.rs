// crates/domain/src/event.rs

//! Stored event model, read-only from the query layer's perspective.

use serde::{Deserialize, Serialize};

/// A single tag entry: the tag name followed by its ordered values.
///
/// `["e", "<event id>", "<relay hint>"]` is represented as
/// `Tag(vec!["e".into(), "<event id>".into(), "<relay hint>".into()])`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag(pub Vec<String>);

impl Tag {
    pub fn name(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Everything after the tag name.
    pub fn values(&self) -> &[String] {
        self.0.get(1..).unwrap_or(&[])
    }
}

/// Event as stored in the `event` table and returned to callers.
///
/// `id` and `pubkey` are 64 lowercase hex chars (32 raw bytes), `sig` is
/// 128 hex chars (64 raw bytes).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u32,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: String,
}

impl Event {
    /// Flattened values of every tag, in tag order.
    ///
    /// Mirrors the derived `tagvalues` column maintained by the schema.
    pub fn tag_values(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .flat_map(|t| t.values().iter().map(String::as_str))
    }
}
