// crates/domain/src/filter.rs

//! Caller-supplied retrieval criteria.
//!
//! On the wire a filter is a JSON object such as
//!
//! ```json
//! { "kinds": [1], "authors": ["<64 hex>"], "#e": ["<64 hex>"], "since": 1700000000, "limit": 20 }
//! ```
//!
//! Keys of the form `#<name>` are collected into [`Filter::tags`] keyed by
//! `<name>`. Other unknown keys are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// Retrieval filter. Immutable input to the query layer.
///
/// `None` means "no constraint" for a dimension; `Some(vec![])` means
/// "match nothing". The two are deliberately distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFilter", into = "RawFilter")]
pub struct Filter {
    /// Hex-encoded 32-byte event ids.
    pub ids: Option<Vec<String>>,
    /// Hex-encoded 32-byte author public keys.
    pub authors: Option<Vec<String>>,
    pub kinds: Option<Vec<u32>>,
    /// Tag name (without the `#`) to accepted values.
    pub tags: BTreeMap<String, Vec<String>>,
    /// Inclusive lower bound on `created_at`.
    pub since: Option<i64>,
    /// Inclusive upper bound on `created_at`.
    pub until: Option<i64>,
    /// Requested row cap; zero, negative or oversized values fall back to policy.
    pub limit: Option<i64>,
}

impl Filter {
    /// True when no dimension constrains the result.
    pub fn is_unconstrained(&self) -> bool {
        self.ids.is_none()
            && self.authors.is_none()
            && self.kinds.is_none()
            && self.tags.is_empty()
            && self.since.is_none()
            && self.until.is_none()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire representation
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct RawFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kinds: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    since: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    until: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<i64>,
    #[serde(flatten)]
    extra: BTreeMap<String, Json>,
}

impl TryFrom<RawFilter> for Filter {
    type Error = String;

    fn try_from(raw: RawFilter) -> Result<Self, Self::Error> {
        let mut tags = BTreeMap::new();
        for (key, value) in raw.extra {
            let Some(name) = key.strip_prefix('#') else {
                continue;
            };
            if name.is_empty() {
                return Err("tag filter key `#` has no tag name".into());
            }
            let values: Vec<String> = serde_json::from_value(value)
                .map_err(|e| format!("tag filter `{key}` must be an array of strings: {e}"))?;
            tags.insert(name.to_string(), values);
        }

        Ok(Filter {
            ids: raw.ids,
            authors: raw.authors,
            kinds: raw.kinds,
            tags,
            since: raw.since,
            until: raw.until,
            limit: raw.limit,
        })
    }
}

impl From<Filter> for RawFilter {
    fn from(f: Filter) -> Self {
        let extra = f
            .tags
            .into_iter()
            .map(|(name, values)| {
                let values = values.into_iter().map(Json::String).collect();
                (format!("#{name}"), Json::Array(values))
            })
            .collect();

        RawFilter {
            ids: f.ids,
            authors: f.authors,
            kinds: f.kinds,
            since: f.since,
            until: f.until,
            limit: f.limit,
            extra,
        }
    }
}
