//! Error types for the editor client.

use concord_core::OperationError;
use concord_sync::SyncError;
use thiserror::Error;

/// Errors raised by the undo manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UndoError {
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Cannot dispose the undo manager while an undo or redo is running")]
    Busy,

    #[error("Undo manager has been disposed")]
    Disposed,

    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),
}

/// Errors raised by the editor client and its adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Local change received before the backend was ready")]
    NotInitialized,

    #[error("Editor client has been disposed")]
    Disposed,

    #[error("Operation error: {0}")]
    Operation(#[from] OperationError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError<OperationError>),

    #[error("Undo error: {0}")]
    Undo(#[from] UndoError),

    #[error("Editor error: {0}")]
    Editor(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
