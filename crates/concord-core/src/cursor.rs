//! Cursor positions and their transformation through edits.

use crate::component::TextOperation;
use crate::operation::PlainTextOperation;
use serde::{Deserialize, Serialize};

/// A caret or selection, as zero-based character offsets.
///
/// `selection_end` may be smaller than `position` for backwards selections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub position: usize,
    pub selection_end: usize,
}

impl Cursor {
    /// Create a cursor selecting from `position` to `selection_end`.
    pub fn new(position: usize, selection_end: usize) -> Self {
        Self {
            position,
            selection_end,
        }
    }

    /// A cursor without selection.
    pub fn caret(position: usize) -> Self {
        Self::new(position, position)
    }

    /// Whether any text is selected.
    pub fn has_selection(&self) -> bool {
        self.position != self.selection_end
    }

    /// The selected range in document order.
    pub fn selection_range(&self) -> std::ops::Range<usize> {
        self.position.min(self.selection_end)..self.position.max(self.selection_end)
    }

    /// Cursors do not merge; the later one simply wins.
    pub fn compose(&self, other: &Cursor) -> Cursor {
        *other
    }

    /// Move the cursor through an operation applied to its document.
    pub fn transform(&self, operation: &PlainTextOperation) -> Cursor {
        let position = transform_index(self.position, operation);
        if self.position == self.selection_end {
            return Cursor::caret(position);
        }
        Cursor::new(position, transform_index(self.selection_end, operation))
    }
}

fn transform_index(index: usize, operation: &PlainTextOperation) -> usize {
    let mut budget = index as isize;
    let mut new_index = index as isize;

    for op in operation.ops() {
        let len = op.len() as isize;
        match op {
            TextOperation::Retain { .. } => budget -= len,
            TextOperation::Insert { .. } => new_index += len,
            TextOperation::Delete { .. } => {
                new_index -= budget.min(len);
                budget -= len;
            }
        }
        if budget < 0 {
            break;
        }
    }

    new_index.max(0) as usize
}
