//! Error types for the operation algebra.

use thiserror::Error;

/// Errors raised by operation construction, application and transformation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("Base length mismatch: operation expects {expected} chars, input has {actual}")]
    BaseLengthMismatch { expected: usize, actual: usize },

    #[error("Retain of {count} chars at offset {offset} runs past the end of the input ({length} chars)")]
    RetainPastEnd {
        offset: usize,
        count: usize,
        length: usize,
    },

    #[error("Operation did not operate on the whole input: consumed {consumed} of {length} chars")]
    IncompleteApply { consumed: usize, length: usize },

    #[error("Cannot compose: first operation targets {target} chars, second expects {base}")]
    ComposeLengthMismatch { target: usize, base: usize },

    #[error("Cannot compose operations: first operation is too short")]
    ComposeTooShort,

    #[error("Cannot compose operations: first operation is too long")]
    ComposeTooLong,

    #[error("Cannot transform: base lengths differ ({left} vs {right})")]
    TransformLengthMismatch { left: usize, right: usize },

    #[error("Cannot transform operations: first operation is too short")]
    TransformTooShort,

    #[error("Cannot transform operations: first operation is too long")]
    TransformTooLong,

    #[error("Incompatible operation components: {0}")]
    Incompatible(String),

    #[error("Malformed wire operation: {0}")]
    MalformedWire(String),
}

impl From<serde_json::Error> for OperationError {
    fn from(err: serde_json::Error) -> Self {
        OperationError::MalformedWire(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OperationError>;
