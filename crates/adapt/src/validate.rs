// crates/adapt/src/validate.rs

//! FilterValidator: bounds an externally supplied filter before any SQL is built.
//!
//! A filter either reduces to a [`SanitizedFilter`] or short-circuits to
//! [`Validation::Empty`], which means "matches nothing, do not touch storage".
//! Only a missing filter is an error.

use crate::Error;
use domain::{filter::Filter, limits::BackendLimits};
use tracing::debug;

/// 32 raw bytes of an event id or author key.
pub type Key32 = [u8; 32];

/// Which rule short-circuited a filter to the empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    TooManyIds,
    NoValidIds,
    TooManyAuthors,
    NoValidAuthors,
    TooManyKinds,
    NoKinds,
    EmptyTagFilter,
    TooManyTagValues,
}

/// Filter after validation: keys decoded, tag values flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedFilter {
    pub ids: Option<Vec<Key32>>,
    pub authors: Option<Vec<Key32>>,
    pub kinds: Option<Vec<u32>>,
    /// Values of every tag filter in tag-name order. Tag names are not kept.
    pub tag_values: Vec<String>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    /// Caller's requested limit, unresolved.
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Empty(EmptyReason),
    Sanitized(SanitizedFilter),
}

#[tracing::instrument(skip_all)]
pub fn validate(filter: Option<&Filter>, limits: &BackendLimits) -> Result<Validation, Error> {
    let filter = filter.ok_or(Error::NullFilter)?;

    match sanitize(filter, limits) {
        Ok(sanitized) => Ok(Validation::Sanitized(sanitized)),
        Err(reason) => {
            debug!(?reason, "filter short-circuits to empty result");
            Ok(Validation::Empty(reason))
        }
    }
}

fn sanitize(filter: &Filter, limits: &BackendLimits) -> Result<SanitizedFilter, EmptyReason> {
    let ids = filter
        .ids
        .as_deref()
        .map(|ids| {
            decode_keys(
                ids,
                limits.max_ids,
                EmptyReason::TooManyIds,
                EmptyReason::NoValidIds,
            )
        })
        .transpose()?;

    let authors = filter
        .authors
        .as_deref()
        .map(|authors| {
            decode_keys(
                authors,
                limits.max_authors,
                EmptyReason::TooManyAuthors,
                EmptyReason::NoValidAuthors,
            )
        })
        .transpose()?;

    let kinds = match filter.kinds.as_deref() {
        Some(kinds) if kinds.len() > limits.max_kinds => return Err(EmptyReason::TooManyKinds),
        Some([]) => return Err(EmptyReason::NoKinds),
        Some(kinds) => Some(kinds.to_vec()),
        None => None,
    };

    let mut tag_values = Vec::new();
    for values in filter.tags.values() {
        if values.is_empty() {
            return Err(EmptyReason::EmptyTagFilter);
        }
        tag_values.extend(values.iter().cloned());
        if tag_values.len() > limits.max_tag_values {
            return Err(EmptyReason::TooManyTagValues);
        }
    }

    Ok(SanitizedFilter {
        ids,
        authors,
        kinds,
        tag_values,
        since: filter.since,
        until: filter.until,
        limit: filter.limit,
    })
}

/// Count check runs on the requested entries; undecodable entries are then
/// dropped without error.
fn decode_keys(
    values: &[String],
    max: usize,
    too_many: EmptyReason,
    none_valid: EmptyReason,
) -> Result<Vec<Key32>, EmptyReason> {
    if values.len() > max {
        return Err(too_many);
    }

    let keys: Vec<Key32> = values.iter().filter_map(|v| decode_key(v)).collect();
    if keys.is_empty() {
        return Err(none_valid);
    }
    Ok(keys)
}

/// Exactly 64 hex chars, either case.
pub fn decode_key(value: &str) -> Option<Key32> {
    let mut out = [0u8; 32];
    hex::decode_to_slice(value, &mut out).ok().map(|_| out)
}

/// `requested` in `[1, max_rows]` is used as-is; anything else (absent, zero,
/// negative, oversized) becomes `max_rows`.
pub fn resolve_limit(requested: Option<i64>, max_rows: u64) -> u64 {
    match requested.and_then(|n| u64::try_from(n).ok()) {
        Some(n) if (1..=max_rows).contains(&n) => n,
        _ => max_rows,
    }
}
