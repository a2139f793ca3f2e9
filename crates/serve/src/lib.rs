pub mod backend;
pub mod exec;
pub mod stream;

pub use backend::EventBackend;
pub use exec::EventQueryExec;
pub use stream::EventStream;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("query build error: {0}")]
    Adapt(#[from] adapt::Error),

    /// Storage failure other than "no rows", carrying the SQL that caused it.
    #[error("failed to fetch events using query {query:?}: {source}")]
    Storage {
        query: String,
        #[source]
        source: BoxError,
    },

    /// A row could not be turned into an event. Terminal for the stream.
    #[error("failed to decode event row: {0}")]
    RowDecode(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("row producer exited before reporting query status")]
    ProducerLost,
}

impl Error {
    pub fn storage(query: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Storage {
            query: query.into(),
            source: source.into(),
        }
    }
}
