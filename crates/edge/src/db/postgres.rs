//! PostgreSQL executor for compiled event queries.
//! - One shared `PgPool`, injected or built from `DatabaseSettings`.
//! - Rows shape: driver stream pumped on a background task (see `serve::stream`).
//! - Count shape: single scalar, "no rows" reads as zero.
//! - Cancellation is raced against every storage await.

use crate::Error;
use adapt::compile::{Bind, CompiledQuery};
use async_trait::async_trait;
use domain::event::{Event, Tag};
use domain::setting::DatabaseSettings;
use serve::stream::{event_channel, EventStream};
use serve::{EventQueryExec, Error as ServeError};
use sqlx::{
    postgres::{PgArguments, PgPoolOptions, PgRow},
    query::Query,
    types::Json,
    PgPool, Postgres, Row,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    #[tracing::instrument(skip_all)]
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, Error> {
        let pool = pool_options(settings)
            .connect(&settings.url)
            .await
            .map_err(Error::Connect)?;
        Ok(Self { pool })
    }

    /// Pool that opens connections on first use only.
    pub fn connect_lazy(settings: &DatabaseSettings) -> Result<Self, Error> {
        let pool = pool_options(settings)
            .connect_lazy(&settings.url)
            .map_err(Error::Connect)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn pool_options(settings: &DatabaseSettings) -> PgPoolOptions {
    PgPoolOptions::new()
        .min_connections(0)
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
}

#[async_trait]
impl EventQueryExec for PgEventStore {
    #[tracing::instrument(skip_all)]
    async fn fetch_events(
        &self,
        query: CompiledQuery,
        cancel: CancellationToken,
    ) -> Result<EventStream, ServeError> {
        let (pump, pending) = event_channel(query.sql.clone(), cancel);
        let pool = self.pool.clone();

        tokio::spawn(async move {
            let CompiledQuery { sql, params } = query;
            let rows = bind_all(sqlx::query(&sql), &params).fetch(&pool);
            pump.run(rows, |row: PgRow| event_from_row(&row)).await;
            debug!("event producer finished");
        });

        pending.ready().await
    }

    #[tracing::instrument(skip_all)]
    async fn count_events(
        &self,
        query: CompiledQuery,
        cancel: CancellationToken,
    ) -> Result<i64, ServeError> {
        let CompiledQuery { sql, params } = query;
        let fetch = bind_all(sqlx::query(&sql), &params).fetch_optional(&self.pool);

        let row = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ServeError::Cancelled),
            row = fetch => row,
        };

        match row {
            Ok(Some(row)) => row
                .try_get::<i64, _>(0)
                .map_err(|e| ServeError::storage(sql.as_str(), e)),
            Ok(None) | Err(sqlx::Error::RowNotFound) => Ok(0),
            Err(e) => Err(ServeError::storage(sql, e)),
        }
    }
}

/// Bind parameters in placeholder order.
fn bind_all<'q>(
    mut q: Query<'q, Postgres, PgArguments>,
    params: &[Bind],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        q = match p {
            Bind::Text(s) => q.bind(s.clone()),
            Bind::Integer(i) => q.bind(*i),
            Bind::TextArray(v) => q.bind(v.clone()),
        };
    }
    q
}

/// Columns in `ROW_COLUMNS` order.
fn event_from_row(row: &PgRow) -> Result<Event, sqlx::Error> {
    let kind = int_column(row, "kind")?;
    let tags: Json<Vec<Tag>> = row.try_get("tags")?;

    Ok(Event {
        id: row.try_get("id")?,
        pubkey: row.try_get("pubkey")?,
        created_at: int_column(row, "created_at")?,
        kind: u32::try_from(kind).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        tags: tags.0,
        content: row.try_get("content")?,
        sig: row.try_get("sig")?,
    })
}

/// Integer column declared as either INTEGER or BIGINT.
fn int_column(row: &PgRow, column: &str) -> Result<i64, sqlx::Error> {
    match row.try_get::<i64, _>(column) {
        Ok(v) => Ok(v),
        Err(sqlx::Error::ColumnDecode { .. }) => row.try_get::<i32, _>(column).map(i64::from),
        Err(e) => Err(e),
    }
}
