pub mod event;
pub mod filter;
pub mod limits;
pub mod setting;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid limits: `{0}` must be a positive integer")]
    NonPositiveLimit(&'static str),

    #[error("invalid database settings: {0}")]
    Database(String),
}
