//! Filter → SQL translation. Pure: nothing here touches storage.
//!
//! Validate → Build → Compile:
//! - [`validate::validate`] bounds a raw [`domain::filter::Filter`] or short-circuits it to an empty result.
//! - [`condition::build_conditions`] turns the sanitized filter into ordered SQL conditions.
//! - [`compile::compile`] renders the rows or count statement from one shared condition set.

pub mod compile;
pub mod condition;
pub mod schema;
pub mod validate;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("filter cannot be null")]
    NullFilter,

    #[error("unsupported bind value produced by query builder: {0}")]
    UnsupportedBind(String),
}
