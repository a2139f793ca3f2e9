// crates/domain/src/limits.rs

use crate::Error;
use serde::{Deserialize, Serialize};

/// Administrator-defined bounds applied to every retrieval request.
///
/// Read from the `[limits]` table of `settings.toml`; absent fields take the
/// defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendLimits {
    /// Most `ids` a filter may carry.
    #[serde(default = "default_max_ids")]
    pub max_ids: usize,

    /// Most `authors` a filter may carry.
    #[serde(default = "default_max_authors")]
    pub max_authors: usize,

    /// Most `kinds` a filter may carry.
    #[serde(default = "default_max_kinds")]
    pub max_kinds: usize,

    /// Most tag values across all tag filters, after flattening.
    #[serde(default = "default_max_tag_values")]
    pub max_tag_values: usize,

    /// Hard cap on returned (and counted) rows.
    #[serde(default = "default_max_rows")]
    pub max_rows: u64,
}

fn default_max_ids() -> usize {
    500
}

fn default_max_authors() -> usize {
    500
}

fn default_max_kinds() -> usize {
    10
}

fn default_max_tag_values() -> usize {
    10
}

fn default_max_rows() -> u64 {
    100
}

impl Default for BackendLimits {
    fn default() -> Self {
        Self {
            max_ids: default_max_ids(),
            max_authors: default_max_authors(),
            max_kinds: default_max_kinds(),
            max_tag_values: default_max_tag_values(),
            max_rows: default_max_rows(),
        }
    }
}

impl BackendLimits {
    /// Every bound must be positive.
    pub fn check(&self) -> Result<(), Error> {
        let fields = [
            ("max_ids", self.max_ids as u64),
            ("max_authors", self.max_authors as u64),
            ("max_kinds", self.max_kinds as u64),
            ("max_tag_values", self.max_tag_values as u64),
            ("max_rows", self.max_rows),
        ];
        match fields.iter().find(|(_, v)| *v == 0) {
            Some((name, _)) => Err(Error::NonPositiveLimit(*name)),
            None => Ok(()),
        }
    }
}
