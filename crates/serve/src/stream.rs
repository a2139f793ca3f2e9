// crates/serve/src/stream.rs

//! Background row producer with single-slot handoff.
//!
//! An executor creates a pair with [`event_channel`], moves the [`RowPump`]
//! into a spawned task together with the driver's row stream, and awaits
//! [`PendingStream::ready`]. `ready` resolves once the storage call has
//! produced its first row (or finished, or failed), so query errors surface
//! before any event does.
//!
//! The pump reserves the channel's only slot *before* pulling the next row,
//! so it is never more than one decoded event ahead of the consumer. It stops
//! when the consumer drops the stream or the token is cancelled.

use crate::{BoxError, Error};
use domain::event::Event;
use futures::stream::{BoxStream, Stream, StreamExt};
use std::fmt;
use std::pin::pin;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lazily produced, finite, non-restartable sequence of events.
///
/// Ends early with one terminal `Err` if a row fails to decode or storage
/// fails mid-stream. Ends silently when the request is cancelled.
pub type EventStream = BoxStream<'static, Result<Event, Error>>;

type Item = Result<Event, Error>;

/// Producer half. Owned by the executor's background task.
pub struct RowPump {
    query: String,
    tx: mpsc::Sender<Item>,
    ready: oneshot::Sender<Result<(), Error>>,
    cancel: CancellationToken,
}

/// Consumer half. Resolves into the stream once the query has started.
pub struct PendingStream {
    rx: mpsc::Receiver<Item>,
    ready: oneshot::Receiver<Result<(), Error>>,
}

pub fn event_channel(query: impl Into<String>, cancel: CancellationToken) -> (RowPump, PendingStream) {
    let (tx, rx) = mpsc::channel(1);
    let (ready_tx, ready_rx) = oneshot::channel();
    (
        RowPump {
            query: query.into(),
            tx,
            ready: ready_tx,
            cancel,
        },
        PendingStream {
            rx,
            ready: ready_rx,
        },
    )
}

impl PendingStream {
    pub async fn ready(self) -> Result<EventStream, Error> {
        match self.ready.await {
            Ok(Ok(())) => Ok(ReceiverStream::new(self.rx).boxed()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::ProducerLost),
        }
    }
}

impl RowPump {
    /// Drive `rows` to completion, decoding each with `decode`.
    pub async fn run<S, R, E, D, DE>(self, rows: S, mut decode: D)
    where
        S: Stream<Item = Result<R, E>>,
        E: Into<BoxError>,
        D: FnMut(R) -> Result<Event, DE>,
        DE: fmt::Display,
    {
        let RowPump {
            query,
            tx,
            ready,
            cancel,
        } = self;
        let mut rows = pin!(rows);

        // The first poll is where the driver actually issues the query.
        let first = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = ready.send(Err(Error::Cancelled));
                return;
            }
            first = rows.next() => first,
        };

        let mut pending = match first {
            None => {
                let _ = ready.send(Ok(()));
                return;
            }
            Some(Err(e)) => {
                let _ = ready.send(Err(Error::storage(query, e)));
                return;
            }
            Some(Ok(row)) => {
                let _ = ready.send(Ok(()));
                Some(row)
            }
        };

        let mut delivered = 0usize;
        loop {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(delivered, "event stream cancelled");
                    return;
                }
                permit = tx.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        debug!(delivered, "event stream consumer went away");
                        return;
                    }
                },
            };

            let row = match pending.take() {
                Some(row) => row,
                None => {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        next = rows.next() => next,
                    };
                    match next {
                        None => return,
                        Some(Ok(row)) => row,
                        Some(Err(e)) => {
                            permit.send(Err(Error::storage(query, e)));
                            return;
                        }
                    }
                }
            };

            match decode(row) {
                Ok(event) => {
                    permit.send(Ok(event));
                    delivered += 1;
                }
                Err(e) => {
                    warn!(delivered, error = %e, "row decode failed, ending event stream");
                    permit.send(Err(Error::RowDecode(e.to_string())));
                    return;
                }
            }
        }
    }
}
