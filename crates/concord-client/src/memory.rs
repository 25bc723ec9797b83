//! In-memory adapters for tests and simulation.
//!
//! [`MemoryServer`] plays the backend: it keeps a totally ordered history and
//! accepts a submission only when it is based on the latest revision. Each
//! connected [`MemoryBackend`] receives its events through an unbounded
//! channel, so the host decides when they are delivered.
//!
//! [`MemoryEditor`] plays the text widget, with a [`MemoryEditorHandle`] that
//! simulates a user typing into it. Typing changes the text at once, the way
//! a real editor does. An undo or redo only runs when the client handles the
//! request, so input that follows one is held back until then.

use crate::adapter::{
    BackendEvent, BackendEventSource, CursorHandle, DatabaseAdapter, EditorAdapter, EditorEvent,
};
use crate::error::Result;
use async_trait::async_trait;
use concord_core::{Cursor, PlainTextOperation};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Counters kept by the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub accepted: usize,
    pub retries: usize,
    pub rejected: usize,
    pub cursor_updates: usize,
}

struct Connection {
    user_id: String,
    user_color: Option<String>,
    user_name: Option<String>,
    events: mpsc::UnboundedSender<BackendEvent>,
}

#[derive(Default)]
struct ServerState {
    document: String,
    history: Vec<(String, PlainTextOperation)>,
    connections: HashMap<String, Connection>,
    stats: ServerStats,
}

impl ServerState {
    fn send(&self, connection_id: &str, event: BackendEvent) {
        if let Some(connection) = self.connections.get(connection_id) {
            if connection.events.send(event).is_err() {
                trace!(connection_id, "connection closed, dropping event");
            }
        }
    }
}

/// A central server with a totally ordered operation history.
#[derive(Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection. The new backend first receives the whole history,
    /// then `InitialRevision` and `Ready`.
    pub fn connect(&self, connection_id: impl Into<String>) -> MemoryBackend {
        let connection_id = connection_id.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut state = self.state.lock();
        for (_, operation) in &state.history {
            let _ = tx.send(BackendEvent::Operation(operation.clone()));
        }
        let _ = tx.send(BackendEvent::InitialRevision);
        let _ = tx.send(BackendEvent::Ready);

        debug!(%connection_id, revision = state.history.len(), "client connected");
        state.connections.insert(
            connection_id.clone(),
            Connection {
                user_id: connection_id.clone(),
                user_color: None,
                user_name: None,
                events: tx,
            },
        );

        MemoryBackend {
            server: self.clone(),
            user_id: connection_id.clone(),
            connection_id,
            revision: 0,
            events: rx,
        }
    }

    /// Close a connection and tell the others its cursor is gone.
    pub fn disconnect(&self, connection_id: &str) {
        let mut state = self.state.lock();
        if let Some(connection) = state.connections.remove(connection_id) {
            debug!(connection_id, "client disconnected");
            let event = BackendEvent::CursorChange {
                client_id: connection.user_id,
                cursor: None,
                user_color: None,
                user_name: None,
            };
            for other in state.connections.keys() {
                state.send(other, event.clone());
            }
        }
    }

    /// The current document.
    pub fn document(&self) -> String {
        self.state.lock().document.clone()
    }

    /// Number of accepted operations.
    pub fn revision(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Every accepted operation in order.
    pub fn history(&self) -> Vec<PlainTextOperation> {
        self.state
            .lock()
            .history
            .iter()
            .map(|(_, operation)| operation.clone())
            .collect()
    }

    /// Counters so far.
    pub fn stats(&self) -> ServerStats {
        self.state.lock().stats
    }

    fn submit(&self, connection_id: &str, revision: usize, operation: &PlainTextOperation) {
        let mut state = self.state.lock();

        if revision != state.history.len() {
            trace!(connection_id, revision, latest = state.history.len(), "stale submission");
            state.stats.retries += 1;
            state.send(connection_id, BackendEvent::Retry);
            return;
        }

        let document = match operation.apply(&state.document) {
            Ok(document) => document,
            Err(err) => {
                warn!(connection_id, %err, "rejecting invalid operation");
                state.stats.rejected += 1;
                let event = BackendEvent::Error {
                    err: err.to_string(),
                    operation: Some(operation.clone()),
                    document: Some(state.document.clone()),
                };
                state.send(connection_id, event);
                return;
            }
        };

        state.document = document;
        state.history.push((connection_id.to_string(), operation.clone()));
        state.stats.accepted += 1;

        for id in state.connections.keys() {
            if id == connection_id {
                state.send(id, BackendEvent::Acknowledge);
            } else {
                state.send(id, BackendEvent::Operation(operation.clone()));
            }
        }
    }

    fn publish_cursor(&self, connection_id: &str, cursor: Option<Cursor>) {
        let mut state = self.state.lock();
        let Some(connection) = state.connections.get(connection_id) else {
            return;
        };

        let event = BackendEvent::CursorChange {
            client_id: connection.user_id.clone(),
            cursor,
            user_color: connection.user_color.clone(),
            user_name: connection.user_name.clone(),
        };
        state.stats.cursor_updates += 1;
        for id in state.connections.keys() {
            if id != connection_id {
                state.send(id, event.clone());
            }
        }
    }

    fn update_connection(&self, connection_id: &str, f: impl FnOnce(&mut Connection)) {
        if let Some(connection) = self.state.lock().connections.get_mut(connection_id) {
            f(connection);
        }
    }
}

/// One client's connection to a [`MemoryServer`].
pub struct MemoryBackend {
    server: MemoryServer,
    connection_id: String,
    user_id: String,
    /// Server operations seen so far, own acknowledged ones included.
    revision: usize,
    events: mpsc::UnboundedReceiver<BackendEvent>,
}

impl MemoryBackend {
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Server operations this connection has received.
    pub fn revision(&self) -> usize {
        self.revision
    }

    fn track(&mut self, event: &BackendEvent) {
        if matches!(event, BackendEvent::Operation(_) | BackendEvent::Acknowledge) {
            self.revision += 1;
        }
    }
}

impl DatabaseAdapter for MemoryBackend {
    fn send_operation(&mut self, operation: &PlainTextOperation) {
        self.server.submit(&self.connection_id, self.revision, operation);
    }

    fn send_cursor(&mut self, cursor: Option<&Cursor>) {
        self.server.publish_cursor(&self.connection_id, cursor.copied());
    }

    fn is_history_empty(&self) -> bool {
        self.revision == 0
    }

    fn is_current_user(&self, client_id: &str) -> bool {
        self.user_id == client_id
    }

    fn set_user_id(&mut self, user_id: &str) {
        self.user_id = user_id.to_string();
        self.server
            .update_connection(&self.connection_id, |c| c.user_id = user_id.to_string());
    }

    fn set_user_color(&mut self, color: &str) {
        self.server
            .update_connection(&self.connection_id, |c| c.user_color = Some(color.to_string()));
    }

    fn set_user_name(&mut self, name: &str) {
        self.server
            .update_connection(&self.connection_id, |c| c.user_name = Some(name.to_string()));
    }
}

#[async_trait]
impl BackendEventSource for MemoryBackend {
    async fn next_event(&mut self) -> Option<BackendEvent> {
        let event = self.events.recv().await;
        if let Some(event) = &event {
            self.track(event);
        }
        event
    }

    fn try_next_event(&mut self) -> Option<BackendEvent> {
        let event = self.events.try_recv().ok();
        if let Some(event) = &event {
            self.track(event);
        }
        event
    }
}

#[derive(Default)]
struct EditorState {
    text: String,
    cursor: Option<Cursor>,
    initiated: bool,
    undo_registered: bool,
    other_cursors: HashMap<String, Cursor>,
    /// An undo or redo request has been sent and not yet handled.
    request_pending: bool,
    held: VecDeque<UserAction>,
}

/// Input from the simulated user.
#[derive(Clone, Debug)]
enum UserAction {
    Insert { at: usize, text: String },
    Delete { at: usize, count: usize },
    MoveCursor(Cursor),
    Focus,
    Blur,
    Undo,
    Redo,
}

/// A plain-text editor kept in memory.
pub struct MemoryEditor {
    state: Arc<Mutex<EditorState>>,
    events: mpsc::UnboundedSender<EditorEvent>,
}

/// Drives a [`MemoryEditor`] the way a user would.
#[derive(Clone)]
pub struct MemoryEditorHandle {
    state: Arc<Mutex<EditorState>>,
    events: mpsc::UnboundedSender<EditorEvent>,
}

impl MemoryEditor {
    /// Create an empty editor, a handle to type into it and the stream of
    /// events it produces.
    pub fn new() -> (
        MemoryEditor,
        MemoryEditorHandle,
        mpsc::UnboundedReceiver<EditorEvent>,
    ) {
        let state = Arc::new(Mutex::new(EditorState::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        let editor = MemoryEditor {
            state: state.clone(),
            events: tx.clone(),
        };
        let handle = MemoryEditorHandle { state, events: tx };
        (editor, handle, rx)
    }
}

/// Apply a local edit and report it.
fn edit(
    state: &Mutex<EditorState>,
    events: &mpsc::UnboundedSender<EditorEvent>,
    operation: PlainTextOperation,
    cursor: Cursor,
) {
    let mut state = state.lock();
    let (text, inverse) = match (operation.apply(&state.text), operation.invert(&state.text)) {
        (Ok(text), Ok(inverse)) => (text, inverse),
        (Err(err), _) | (_, Err(err)) => {
            let _ = events.send(EditorEvent::Error {
                message: err.to_string(),
            });
            return;
        }
    };
    state.text = text;
    state.cursor = Some(cursor);
    drop(state);

    let _ = events.send(EditorEvent::Change { operation, inverse });
    let _ = events.send(EditorEvent::Cursor);
}

/// Run a user action, or hold it while an undo or redo request is pending.
fn act(state: &Mutex<EditorState>, events: &mpsc::UnboundedSender<EditorEvent>, action: UserAction) {
    {
        let mut guard = state.lock();
        if guard.request_pending {
            trace!(?action, "holding input until the pending request is handled");
            guard.held.push_back(action);
            return;
        }
    }
    run(state, events, action);
}

fn run(state: &Mutex<EditorState>, events: &mpsc::UnboundedSender<EditorEvent>, action: UserAction) {
    let len = state.lock().text.chars().count();
    match action {
        UserAction::Insert { at, text } => {
            let at = at.min(len);
            let operation = PlainTextOperation::new()
                .retain(at)
                .insert(&text)
                .retain(len - at);
            let cursor = Cursor::caret(at + text.chars().count());
            edit(state, events, operation, cursor);
        }
        UserAction::Delete { at, count } => {
            let at = at.min(len);
            let count = count.min(len - at);
            if count == 0 {
                return;
            }
            let operation = PlainTextOperation::new()
                .retain(at)
                .delete(count)
                .retain(len - at - count);
            edit(state, events, operation, Cursor::caret(at));
        }
        UserAction::MoveCursor(cursor) => {
            let cursor = Cursor::new(cursor.position.min(len), cursor.selection_end.min(len));
            state.lock().cursor = Some(cursor);
            let _ = events.send(EditorEvent::Cursor);
        }
        UserAction::Focus => {
            let _ = events.send(EditorEvent::Focus);
        }
        UserAction::Blur => {
            let _ = events.send(EditorEvent::Blur);
        }
        UserAction::Undo => request(state, events, EditorEvent::Undo),
        UserAction::Redo => request(state, events, EditorEvent::Redo),
    }
}

fn request(state: &Mutex<EditorState>, events: &mpsc::UnboundedSender<EditorEvent>, event: EditorEvent) {
    state.lock().request_pending = true;
    let _ = events.send(event);
}

/// Replay held input until it is used up or another request is sent.
fn resume(state: &Mutex<EditorState>, events: &mpsc::UnboundedSender<EditorEvent>) {
    state.lock().request_pending = false;
    loop {
        let action = {
            let mut guard = state.lock();
            if guard.request_pending {
                return;
            }
            match guard.held.pop_front() {
                Some(action) => action,
                None => return,
            }
        };
        run(state, events, action);
    }
}

impl EditorAdapter for MemoryEditor {
    fn get_text(&self) -> String {
        self.state.lock().text.clone()
    }

    fn set_text(&mut self, text: &str) {
        let current = self.state.lock().text.clone();
        let operation = PlainTextOperation::new().delete_text(&current).insert(text);
        let end = Cursor::caret(text.chars().count());
        edit(&self.state, &self.events, operation, end);
    }

    fn apply_operation(&mut self, operation: &PlainTextOperation) -> Result<()> {
        let mut state = self.state.lock();
        state.text = operation.apply(&state.text)?;
        state.cursor = state.cursor.map(|cursor| cursor.transform(operation));
        Ok(())
    }

    fn get_cursor(&self) -> Option<Cursor> {
        self.state.lock().cursor
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.state.lock().cursor = Some(cursor);
    }

    fn set_other_cursor(
        &mut self,
        client_id: &str,
        cursor: Cursor,
        _color: Option<&str>,
        _name: Option<&str>,
    ) -> Box<dyn CursorHandle> {
        self.state
            .lock()
            .other_cursors
            .insert(client_id.to_string(), cursor);
        Box::new(MemoryCursorHandle {
            state: self.state.clone(),
            client_id: client_id.to_string(),
        })
    }

    fn set_initiated(&mut self, initiated: bool) {
        self.state.lock().initiated = initiated;
    }

    fn register_undo_redo(&mut self) {
        self.state.lock().undo_registered = true;
    }

    fn undo_redo_handled(&mut self) {
        resume(&self.state, &self.events);
    }
}

struct MemoryCursorHandle {
    state: Arc<Mutex<EditorState>>,
    client_id: String,
}

impl CursorHandle for MemoryCursorHandle {
    fn clear(&mut self) {
        self.state.lock().other_cursors.remove(&self.client_id);
    }
}

impl MemoryEditorHandle {
    /// The editor text as the user sees it.
    pub fn text(&self) -> String {
        self.state.lock().text.clone()
    }

    /// Length of the text in characters.
    pub fn len(&self) -> usize {
        self.state.lock().text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().text.is_empty()
    }

    /// The local cursor.
    pub fn cursor(&self) -> Option<Cursor> {
        self.state.lock().cursor
    }

    /// Whether the client has marked the editor as loaded.
    pub fn is_initiated(&self) -> bool {
        self.state.lock().initiated
    }

    /// Whether the client took over undo and redo.
    pub fn is_undo_registered(&self) -> bool {
        self.state.lock().undo_registered
    }

    /// Remote cursors currently drawn, by client id.
    pub fn other_cursors(&self) -> HashMap<String, Cursor> {
        self.state.lock().other_cursors.clone()
    }

    /// Whether an undo or redo request is waiting for the client.
    pub fn is_request_pending(&self) -> bool {
        self.state.lock().request_pending
    }

    /// Type `text` at `at` (clamped to the end of the document).
    pub fn insert(&self, at: usize, text: &str) {
        self.act(UserAction::Insert {
            at,
            text: text.to_string(),
        });
    }

    /// Delete up to `count` characters starting at `at`.
    pub fn delete(&self, at: usize, count: usize) {
        self.act(UserAction::Delete { at, count });
    }

    /// Move the caret or selection, clamped to the document.
    pub fn move_cursor(&self, cursor: Cursor) {
        self.act(UserAction::MoveCursor(cursor));
    }

    /// Give the editor focus.
    pub fn focus(&self) {
        self.act(UserAction::Focus);
    }

    /// Take focus away.
    pub fn blur(&self) {
        self.act(UserAction::Blur);
    }

    /// Ask the client to undo. Input that follows is held until the client
    /// has handled the request.
    pub fn undo(&self) {
        self.act(UserAction::Undo);
    }

    /// Ask the client to redo, holding later input like [`undo`](Self::undo).
    pub fn redo(&self) {
        self.act(UserAction::Redo);
    }

    fn act(&self, action: UserAction) {
        act(&self.state, &self.events, action);
    }

    /// Report an editor failure to the client.
    pub fn report_error(&self, message: impl Into<String>) {
        let _ = self.events.send(EditorEvent::Error {
            message: message.into(),
        });
    }
}
