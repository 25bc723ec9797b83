//! The operational trait - what the sync protocol needs from an operation.
//!
//! Any operation type that can be sequenced and rebased satisfies:
//!  - Compose: apply(apply(S, a), b) = apply(S, a.compose(b))
//!  - Transform: apply(apply(S, a), b') = apply(apply(S, b), a')
//!
//! The protocol is generic over this trait so the same state machine drives
//! bare operations and operations carrying cursor metadata.

use crate::error::OperationError;
use crate::operation::PlainTextOperation;

/// An operation that can be composed and transformed.
pub trait Operational: Clone {
    /// Error raised when two operations do not fit together
    type Error: std::error::Error + Send + Sync + 'static;

    /// Combine with an operation applied right after this one.
    fn compose(&self, other: &Self) -> Result<Self, Self::Error>;

    /// Rebase against a concurrent operation, returning `(self', other')`.
    fn transform(&self, other: &Self) -> Result<(Self, Self), Self::Error>;

    /// Whether applying this operation changes nothing.
    fn is_noop(&self) -> bool;
}

impl Operational for PlainTextOperation {
    type Error = OperationError;

    fn compose(&self, other: &Self) -> Result<Self, Self::Error> {
        PlainTextOperation::compose(self, other)
    }

    fn transform(&self, other: &Self) -> Result<(Self, Self), Self::Error> {
        PlainTextOperation::transform(self, other)
    }

    fn is_noop(&self) -> bool {
        PlainTextOperation::is_noop(self)
    }
}
