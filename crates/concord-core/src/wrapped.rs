//! Operations carrying the cursor that surrounded them.
//!
//! The undo stack stores these so that undoing an edit also restores the
//! cursor to where it was before the edit.

use crate::cursor::Cursor;
use crate::error::{OperationError, Result};
use crate::operation::PlainTextOperation;
use crate::operational::Operational;

/// Cursor before and after an edit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperationMetadata {
    pub cursor_before: Option<Cursor>,
    pub cursor_after: Option<Cursor>,
}

impl OperationMetadata {
    /// Create metadata from the two cursors.
    pub fn new(cursor_before: Option<Cursor>, cursor_after: Option<Cursor>) -> Self {
        Self {
            cursor_before,
            cursor_after,
        }
    }

    /// Swap before and after.
    pub fn invert(&self) -> Self {
        Self::new(self.cursor_after, self.cursor_before)
    }

    /// Keep this `before`, take the other's `after`.
    pub fn compose(&self, other: Option<&OperationMetadata>) -> Self {
        Self::new(self.cursor_before, other.and_then(|meta| meta.cursor_after))
    }

    /// Map both cursors through a concurrent operation.
    pub fn transform(&self, operation: &PlainTextOperation) -> Self {
        Self::new(
            self.cursor_before.map(|cursor| cursor.transform(operation)),
            self.cursor_after.map(|cursor| cursor.transform(operation)),
        )
    }
}

/// A [`PlainTextOperation`] plus optional cursor metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WrappedOperation {
    pub operation: PlainTextOperation,
    pub metadata: Option<OperationMetadata>,
}

impl WrappedOperation {
    /// Wrap an operation with its cursor metadata.
    pub fn new(operation: PlainTextOperation, metadata: Option<OperationMetadata>) -> Self {
        Self {
            operation,
            metadata,
        }
    }

    /// Wrap an operation without cursor information.
    pub fn bare(operation: PlainTextOperation) -> Self {
        Self::new(operation, None)
    }

    /// Cursor before the edit, if recorded.
    pub fn cursor_before(&self) -> Option<Cursor> {
        self.metadata.and_then(|meta| meta.cursor_before)
    }

    /// Cursor after the edit, if recorded.
    pub fn cursor_after(&self) -> Option<Cursor> {
        self.metadata.and_then(|meta| meta.cursor_after)
    }

    /// Apply the operation; the metadata plays no part.
    pub fn apply(&self, content: &str) -> Result<String> {
        self.operation.apply(content)
    }

    /// Invert the operation and swap the cursors.
    pub fn invert(&self, content: &str) -> Result<Self> {
        Ok(Self::new(
            self.operation.invert(content)?,
            self.metadata.map(|meta| meta.invert()),
        ))
    }

    /// Compose both operations and merge their metadata.
    pub fn compose(&self, other: &Self) -> Result<Self> {
        Ok(Self::new(
            self.operation.compose(&other.operation)?,
            self.metadata.map(|meta| meta.compose(other.metadata.as_ref())),
        ))
    }

    /// Transform against a concurrent wrapped operation, moving each
    /// side's cursors through the other's edit.
    pub fn transform(&self, other: &Self) -> Result<(Self, Self)> {
        let (left, right) = self.operation.transform(&other.operation)?;
        Ok((
            Self::new(left, self.metadata.map(|meta| meta.transform(&other.operation))),
            Self::new(right, other.metadata.map(|meta| meta.transform(&self.operation))),
        ))
    }
}

impl From<PlainTextOperation> for WrappedOperation {
    fn from(operation: PlainTextOperation) -> Self {
        Self::bare(operation)
    }
}

impl Operational for WrappedOperation {
    type Error = OperationError;

    fn compose(&self, other: &Self) -> Result<Self> {
        WrappedOperation::compose(self, other)
    }

    fn transform(&self, other: &Self) -> Result<(Self, Self)> {
        WrappedOperation::transform(self, other)
    }

    fn is_noop(&self) -> bool {
        self.operation.is_noop()
    }
}
