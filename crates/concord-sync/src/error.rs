//! Error types for the synchronization protocol.

use thiserror::Error;

/// Errors raised by protocol transitions.
///
/// `E` is the error type of the operations being synchronized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError<E> {
    /// An acknowledgement or retry arrived while nothing was in flight.
    #[error("No pending operation")]
    NoPendingOperation,

    #[error("State machine has been disposed")]
    Disposed,

    #[error("Operation error: {0}")]
    Operation(#[from] E),
}

pub type Result<T, E> = std::result::Result<T, SyncError<E>>;
