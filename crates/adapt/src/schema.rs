// crates/adapt/src/schema.rs

//! Names of the `event` table and its columns, as created by the migration
//! collaborator.

use sea_query::Iden;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventCol {
    Table,
    Id,
    Pubkey,
    CreatedAt,
    Kind,
    Tags,
    Content,
    Sig,
    /// Derived `text[]` of every tag value, maintained at write time.
    TagValues,
}

impl EventCol {
    pub const fn as_str(self) -> &'static str {
        match self {
            EventCol::Table => "event",
            EventCol::Id => "id",
            EventCol::Pubkey => "pubkey",
            EventCol::CreatedAt => "created_at",
            EventCol::Kind => "kind",
            EventCol::Tags => "tags",
            EventCol::Content => "content",
            EventCol::Sig => "sig",
            EventCol::TagValues => "tagvalues",
        }
    }
}

impl Iden for EventCol {
    fn unquoted(&self, s: &mut dyn fmt::Write) {
        let _ = write!(s, "{}", self.as_str());
    }
}

/// Projection of the rows shape, in decode order.
pub const ROW_COLUMNS: [EventCol; 7] = [
    EventCol::Id,
    EventCol::Pubkey,
    EventCol::CreatedAt,
    EventCol::Kind,
    EventCol::Tags,
    EventCol::Content,
    EventCol::Sig,
];
