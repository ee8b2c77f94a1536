//! Store helper
//!
//! Serves the helper protocol for a single peer: one command at a time,
//! strictly in order, against a [`Store`](crate::store::Store).

mod dispatcher;

pub use dispatcher::{serve_stdio, DispatchStats, Dispatcher, Step};

use crate::protocol::ProtocolError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors that end a helper connection
#[derive(Debug, Error)]
pub enum HelperError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
}

impl From<std::io::Error> for HelperError {
    fn from(e: std::io::Error) -> Self {
        HelperError::Protocol(ProtocolError::Io(e))
    }
}
