//! # Error Types
//!
//! Errors raised by transports. The replication core wraps them with the
//! operation that failed.

use crate::entities::Address;
use thiserror::Error;

/// Failures of the point-to-point call or of a duplex stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No participant is reachable at this address.
    #[error("Address unreachable: {address}")]
    Unreachable { address: Address },

    /// The stream was closed by the remote end (no further messages).
    #[error("Stream closed")]
    Closed,

    /// The remote handler failed; the text is its error message.
    #[error("Remote error: {0}")]
    Remote(String),
}
