//! Undo/Redo for collaborative editing.
//!
//! The stacks hold *inverses* of local edits, each wrapped with the cursor
//! to restore. Remote edits never enter the stacks; instead every stacked
//! inverse is transformed against them so it still applies to the current
//! document.

use crate::config::DEFAULT_MAX_UNDO_ITEMS;
use crate::error::UndoError;
use concord_core::WrappedOperation;
use std::collections::VecDeque;
use tracing::{debug, trace};

type Snapshot = (VecDeque<WrappedOperation>, VecDeque<WrappedOperation>, bool);

/// What the manager is doing right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UndoMode {
    Normal,
    Undoing,
    Redoing,
}

/// Undo and redo stacks for one editing session.
#[derive(Clone, Debug)]
pub struct UndoManager {
    undo_stack: VecDeque<WrappedOperation>,
    redo_stack: VecDeque<WrappedOperation>,
    mode: UndoMode,
    /// Set after an undo so the next edit starts a fresh step.
    dont_compose: bool,
    max_items: usize,
    disposed: bool,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO_ITEMS)
    }
}

impl UndoManager {
    /// Create a manager keeping at most `max_items` steps per stack.
    pub fn new(max_items: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            mode: UndoMode::Normal,
            dont_compose: false,
            max_items: max_items.max(1),
            disposed: false,
        }
    }

    /// Steps kept per stack before the oldest is evicted.
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn mode(&self) -> UndoMode {
        self.mode
    }

    fn ensure_live(&self) -> Result<(), UndoError> {
        if self.disposed {
            return Err(UndoError::Disposed);
        }
        Ok(())
    }

    fn push_bounded(stack: &mut VecDeque<WrappedOperation>, operation: WrappedOperation, max: usize) {
        stack.push_back(operation);
        while stack.len() > max {
            stack.pop_front();
        }
    }

    /// Record an inverse.
    ///
    /// In normal mode the inverse of a local edit goes on the undo stack,
    /// merged with the previous step when `compose` is set. While undoing it
    /// is the redo step; while redoing it is the next undo step.
    pub fn add(&mut self, operation: WrappedOperation, compose: bool) -> Result<(), UndoError> {
        self.ensure_live()?;

        match self.mode {
            UndoMode::Undoing => {
                Self::push_bounded(&mut self.redo_stack, operation, self.max_items);
                self.dont_compose = true;
            }
            UndoMode::Redoing => {
                Self::push_bounded(&mut self.undo_stack, operation, self.max_items);
                self.dont_compose = false;
            }
            UndoMode::Normal => {
                let merged = match self.undo_stack.back() {
                    Some(top) if compose && !self.dont_compose => Some(operation.compose(top)?),
                    _ => None,
                };
                match merged {
                    Some(merged) => {
                        trace!("merging edit into previous undo step");
                        self.undo_stack.pop_back();
                        self.undo_stack.push_back(merged);
                    }
                    None => Self::push_bounded(&mut self.undo_stack, operation, self.max_items),
                }
                self.dont_compose = false;
                self.redo_stack.clear();
            }
        }
        Ok(())
    }

    /// Rebase both stacks over a remote operation.
    pub fn transform(&mut self, remote: &WrappedOperation) -> Result<(), UndoError> {
        self.ensure_live()?;

        let undo_stack = Self::transform_stack(&self.undo_stack, remote)?;
        let redo_stack = Self::transform_stack(&self.redo_stack, remote)?;
        self.undo_stack = undo_stack;
        self.redo_stack = redo_stack;
        Ok(())
    }

    fn transform_stack(
        stack: &VecDeque<WrappedOperation>,
        remote: &WrappedOperation,
    ) -> Result<VecDeque<WrappedOperation>, UndoError> {
        let mut remote = remote.clone();
        let mut rebased = VecDeque::with_capacity(stack.len());

        // Newest first: each entry applies to the document the one above it left.
        for entry in stack.iter().rev() {
            let (entry, next_remote) = entry.transform(&remote)?;
            if !entry.operation.is_noop() {
                rebased.push_front(entry);
            }
            remote = next_remote;
        }
        Ok(rebased)
    }

    /// Pop the newest undo step and hand it to `f`.
    ///
    /// Anything `f` adds while running lands on the redo stack. If `f`
    /// fails, both stacks are put back as they were.
    pub fn perform_undo<F, R, E>(&mut self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut UndoManager, WrappedOperation) -> Result<R, E>,
        E: From<UndoError>,
    {
        self.ensure_live()?;
        let saved = self.snapshot();
        let operation = self.undo_stack.pop_back().ok_or(UndoError::NothingToUndo)?;

        debug!(remaining = self.undo_stack.len(), "performing undo");
        self.run_step(UndoMode::Undoing, operation, saved, f)
    }

    /// Pop the newest redo step and hand it to `f`.
    ///
    /// Anything `f` adds while running lands on the undo stack. If `f`
    /// fails, both stacks are put back as they were.
    pub fn perform_redo<F, R, E>(&mut self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut UndoManager, WrappedOperation) -> Result<R, E>,
        E: From<UndoError>,
    {
        self.ensure_live()?;
        let saved = self.snapshot();
        let operation = self.redo_stack.pop_back().ok_or(UndoError::NothingToRedo)?;

        debug!(remaining = self.redo_stack.len(), "performing redo");
        self.run_step(UndoMode::Redoing, operation, saved, f)
    }

    fn snapshot(&self) -> Snapshot {
        (self.undo_stack.clone(), self.redo_stack.clone(), self.dont_compose)
    }

    fn run_step<F, R, E>(
        &mut self,
        mode: UndoMode,
        operation: WrappedOperation,
        saved: Snapshot,
        f: F,
    ) -> Result<R, E>
    where
        F: FnOnce(&mut UndoManager, WrappedOperation) -> Result<R, E>,
    {
        self.mode = mode;
        let result = f(self, operation);
        self.mode = UndoMode::Normal;

        if result.is_err() {
            debug!(?mode, "step failed, restoring stacks");
            (self.undo_stack, self.redo_stack, self.dont_compose) = saved;
        }
        result
    }

    /// Forget every step, for when the stacks no longer match the document.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.dont_compose = false;
    }

    /// Whether an undo step is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether a redo step is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Whether an undo callback is running.
    pub fn is_undoing(&self) -> bool {
        self.mode == UndoMode::Undoing
    }

    pub fn is_redoing(&self) -> bool {
        self.mode == UndoMode::Redoing
    }

    /// Number of undo steps.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redo steps.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// The step the next undo would apply.
    pub fn last_undo(&self) -> Option<&WrappedOperation> {
        self.undo_stack.back()
    }

    /// The step the next redo would apply.
    pub fn last_redo(&self) -> Option<&WrappedOperation> {
        self.redo_stack.back()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Drop both stacks and refuse further changes.
    pub fn dispose(&mut self) -> Result<(), UndoError> {
        if self.mode != UndoMode::Normal {
            return Err(UndoError::Busy);
        }
        if !self.disposed {
            self.undo_stack.clear();
            self.redo_stack.clear();
            self.disposed = true;
        }
        Ok(())
    }
}
