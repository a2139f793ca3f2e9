// crates/serve/src/backend.rs

//! Retrieval entry points: Validate → Build → Compile → Execute.
//!
//! `EventBackend` is a pure function of (filter, limits) plus the one injected
//! executor. Filters that validate to "matches nothing" never reach storage.

use crate::{exec::EventQueryExec, stream::EventStream, Error};
use adapt::compile::{compile, CompiledQuery, Shape};
use adapt::condition::build_conditions;
use adapt::validate::{validate, Validation};
use domain::{filter::Filter, limits::BackendLimits};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct EventBackend<X> {
    exec: X,
    limits: BackendLimits,
}

impl<X: EventQueryExec> EventBackend<X> {
    pub fn new(exec: X, limits: BackendLimits) -> Self {
        Self { exec, limits }
    }

    pub fn limits(&self) -> &BackendLimits {
        &self.limits
    }

    /// Compile `filter` into `shape` without executing it.
    ///
    /// `Ok(None)` means the filter matches nothing and storage must not be queried.
    pub fn plan(&self, filter: Option<&Filter>, shape: Shape) -> Result<Option<CompiledQuery>, Error> {
        let sanitized = match validate(filter, &self.limits)? {
            Validation::Empty(_) => return Ok(None),
            Validation::Sanitized(s) => s,
        };
        let conditions = build_conditions(&sanitized, &self.limits);
        Ok(Some(compile(&conditions, shape)?))
    }

    /// Matching events, newest first, at most the resolved limit.
    ///
    /// Errors only for a missing filter or a storage failure. Empty-result
    /// filters yield an empty stream.
    #[tracing::instrument(skip_all)]
    pub async fn query_events(
        &self,
        filter: Option<&Filter>,
        cancel: CancellationToken,
    ) -> Result<EventStream, Error> {
        match self.plan(filter, Shape::Rows)? {
            None => Ok(stream::empty().boxed()),
            Some(query) => {
                debug!(sql = %query.sql, params = query.params.len(), "fetching events");
                self.exec.fetch_events(query, cancel).await
            }
        }
    }

    /// Number of matching events, capped at the resolved limit.
    #[tracing::instrument(skip_all)]
    pub async fn count_events(
        &self,
        filter: Option<&Filter>,
        cancel: CancellationToken,
    ) -> Result<i64, Error> {
        match self.plan(filter, Shape::Count)? {
            None => Ok(0),
            Some(query) => {
                debug!(sql = %query.sql, params = query.params.len(), "counting events");
                self.exec.count_events(query, cancel).await
            }
        }
    }
}
