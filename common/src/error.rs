//! Failure taxonomy for a single coordinator/worker exchange.
//!
//! Everything here is recoverable from the coordinator's point of view:
//! the segment goes back to the queue and a later connection retries it.
//! Only bind/listen failures and a fully empty final result are fatal,
//! and those are reported as plain `anyhow` errors by the binaries.

use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Malformed length header, or a payload that is not the expected
    /// JSON shape (missing `segment`/`result` key included).
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The socket failed, or the peer closed mid-frame.
    #[error("socket error: {0}")]
    Connection(String),

    /// The peer closed cleanly before sending any part of a frame.
    ///
    /// On the worker side this is how the coordinator signals that the
    /// queue is drained; on the coordinator side it means the worker
    /// vanished before replying.
    #[error("peer closed the connection")]
    Closed,

    /// No complete result frame arrived within the session deadline.
    #[error("no result within {0:?}")]
    Timeout(Duration),
}

impl ExchangeError {
    /// Short tag used when recording a failure reason against a segment.
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::Protocol(_) => "protocol",
            ExchangeError::Connection(_) => "connection",
            ExchangeError::Closed => "closed",
            ExchangeError::Timeout(_) => "timeout",
        }
    }
}

impl From<io::Error> for ExchangeError {
    fn from(err: io::Error) -> Self {
        // UnexpectedEof here means the peer went away mid-frame; the
        // clean frame-boundary close is detected by the codec itself.
        ExchangeError::Connection(err.to_string())
    }
}
