use crate::{limits::BackendLimits, Error};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Connection URL, e.g. `postgres://relay@localhost/relay`
    pub url: String,

    /// Upper bound on pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a free connection before failing a request
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    #[serde(default)]
    pub limits: BackendLimits,
}

impl Settings {
    pub fn check(&self) -> Result<(), Error> {
        if self.database.url.trim().is_empty() {
            return Err(Error::Database("url must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Database("max_connections must be positive".into()));
        }
        self.limits.check()
    }
}
