//! Contracts between the editor client and its surroundings.
//!
//! An [`EditorAdapter`] wraps the text widget the user types into; a
//! [`DatabaseAdapter`] wraps the backend that orders operations. Both report
//! what happened to them as events that the host feeds into
//! [`EditorClient`](crate::EditorClient).

use crate::error::Result;
use async_trait::async_trait;
use concord_core::{Cursor, PlainTextOperation, WrappedOperation};

/// A remote cursor drawn in the editor. Clearing removes it from view.
pub trait CursorHandle: Send {
    fn clear(&mut self);
}

/// The local text editor.
pub trait EditorAdapter {
    fn get_text(&self) -> String;

    /// Replace the whole text. Reported back as a local change.
    fn set_text(&mut self, text: &str);

    /// Apply a remote or undo operation. Must work even when read-only and
    /// must not be reported back as a local change.
    fn apply_operation(&mut self, operation: &PlainTextOperation) -> Result<()>;

    /// Invert an operation against the current text.
    fn invert_operation(&self, operation: &WrappedOperation) -> Result<WrappedOperation> {
        Ok(operation.invert(&self.get_text())?)
    }

    fn get_cursor(&self) -> Option<Cursor>;

    fn set_cursor(&mut self, cursor: Cursor);

    /// Draw another user's cursor.
    fn set_other_cursor(
        &mut self,
        client_id: &str,
        cursor: Cursor,
        color: Option<&str>,
        name: Option<&str>,
    ) -> Box<dyn CursorHandle>;

    /// Called once the document has been loaded from the backend.
    fn set_initiated(&mut self, initiated: bool);

    /// Take over native undo/redo; requests arrive as [`EditorEvent::Undo`]
    /// and [`EditorEvent::Redo`] from then on.
    fn register_undo_redo(&mut self);

    /// Called once an undo or redo request has been handled, whether or not
    /// it changed anything. Editors that queue input behind such a request
    /// release it here.
    fn undo_redo_handled(&mut self) {}
}

/// Something that happened in the editor.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    /// The user edited the text. `inverse` reverts `operation`.
    Change {
        operation: PlainTextOperation,
        inverse: PlainTextOperation,
    },
    /// The caret or selection moved.
    Cursor,
    Focus,
    Blur,
    Undo,
    Redo,
    Error { message: String },
}

/// The backend that totally orders operations and relays cursors.
pub trait DatabaseAdapter {
    /// Submit a local operation based on the latest revision seen.
    fn send_operation(&mut self, operation: &PlainTextOperation);

    /// Publish this user's cursor, or `None` to hide it.
    fn send_cursor(&mut self, cursor: Option<&Cursor>);

    fn is_history_empty(&self) -> bool;

    fn is_current_user(&self, client_id: &str) -> bool;

    fn set_user_id(&mut self, user_id: &str);

    fn set_user_color(&mut self, color: &str);

    fn set_user_name(&mut self, name: &str);
}

/// Something that happened in the backend.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendEvent {
    /// The document has been loaded and the backend accepts operations.
    Ready,
    /// The initial snapshot has been replayed.
    InitialRevision,
    /// An operation from another client.
    Operation(PlainTextOperation),
    /// The last submitted operation was accepted.
    Acknowledge,
    /// The last submitted operation was rejected and should be resent.
    Retry,
    CursorChange {
        client_id: String,
        cursor: Option<Cursor>,
        user_color: Option<String>,
        user_name: Option<String>,
    },
    Error {
        err: String,
        operation: Option<PlainTextOperation>,
        document: Option<String>,
    },
}

/// A stream of backend events.
#[async_trait]
pub trait BackendEventSource: Send {
    /// Wait for the next event; `None` once the backend is gone.
    async fn next_event(&mut self) -> Option<BackendEvent>;

    /// The next event if one is ready.
    fn try_next_event(&mut self) -> Option<BackendEvent>;
}
