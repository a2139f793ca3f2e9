use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("invalid settings: {0}")]
    Settings(#[from] domain::Error),

    #[error("Connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("invalid filter JSON: {0}")]
    FilterJson(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("query error: {0}")]
    Query(#[from] serve::Error),
}
