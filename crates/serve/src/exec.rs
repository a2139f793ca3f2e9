// crates/serve/src/exec.rs

//! Executor port. Storage adapters (edge) implement this; the backend only
//! ever sees compiled SQL going in and events or a count coming out.

use crate::{stream::EventStream, Error};
use adapt::compile::CompiledQuery;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventQueryExec: Send + Sync {
    /// Issue a rows-shaped query once and stream the decoded events.
    ///
    /// A storage failure must be returned here, before any event is produced.
    async fn fetch_events(
        &self,
        query: CompiledQuery,
        cancel: CancellationToken,
    ) -> Result<EventStream, Error>;

    /// Issue a count-shaped query. "No rows" is a count of zero.
    async fn count_events(
        &self,
        query: CompiledQuery,
        cancel: CancellationToken,
    ) -> Result<i64, Error>;
}
