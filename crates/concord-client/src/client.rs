//! The editor client: wires an editor, a backend, the sync protocol and the
//! undo manager together.

use crate::adapter::{BackendEvent, DatabaseAdapter, EditorAdapter, EditorEvent};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::presence::PresenceRegistry;
use crate::undo::UndoManager;
use concord_core::{Cursor, OperationError, OperationMetadata, PlainTextOperation, WrappedOperation};
use concord_sync::{ProtocolState, StateMachine, TransitionHandler};
use tokio::sync::broadcast;
use tracing::{debug, error, trace, warn};

/// Events emitted by an editor client.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    /// The document is loaded and local edits are accepted.
    Ready,
    /// Whether every local edit has been acknowledged, sent on each change.
    Synced(bool),
    Undo,
    Redo,
    /// Another user's cursor moved or went away.
    RemoteCursor {
        client_id: String,
        cursor: Option<Cursor>,
    },
    Error {
        message: String,
        operation: Option<PlainTextOperation>,
        document: Option<String>,
    },
}

/// Routes protocol side effects to the adapters.
struct SyncBridge<'a, E, B> {
    editor: &'a mut E,
    backend: &'a mut B,
    undo: &'a mut UndoManager,
    cursor: &'a mut Option<Cursor>,
    /// Length of the document as this client has seen it.
    document_len: &'a mut usize,
    failure: Option<ClientError>,
}

impl<'a, E: EditorAdapter, B: DatabaseAdapter> SyncBridge<'a, E, B> {
    fn new(
        editor: &'a mut E,
        backend: &'a mut B,
        undo: &'a mut UndoManager,
        cursor: &'a mut Option<Cursor>,
        document_len: &'a mut usize,
    ) -> Self {
        Self {
            editor,
            backend,
            undo,
            cursor,
            document_len,
            failure: None,
        }
    }

    fn finish(self) -> Result<()> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<'a, E: EditorAdapter, B: DatabaseAdapter> TransitionHandler<PlainTextOperation>
    for SyncBridge<'a, E, B>
{
    fn send_operation(&mut self, operation: &PlainTextOperation) {
        debug!(%operation, "sending operation");
        self.backend.send_operation(operation);
    }

    fn apply_operation(&mut self, operation: &PlainTextOperation) {
        trace!(%operation, "applying remote operation");
        if let Err(err) = self.editor.apply_operation(operation) {
            self.failure.get_or_insert(err);
            return;
        }
        *self.document_len = operation.target_length();
        *self.cursor = self.editor.get_cursor();
        if let Err(err) = self.undo.transform(&WrappedOperation::bare(operation.clone())) {
            // Steps that cannot follow the document would fail every later
            // transform, so they are dropped.
            warn!(%err, "undo history no longer matches the document, clearing it");
            self.undo.clear();
            self.failure.get_or_insert(err.into());
        }
    }
}

/// A collaborative editing client for one document.
///
/// The client is driven by feeding it events from its two adapters. Each
/// event is handled to completion before the call returns.
///
/// # Example
///
/// ```rust
/// use concord_client::{BackendEvent, ClientConfig, EditorClient};
/// use concord_client::memory::{MemoryEditor, MemoryServer};
///
/// let server = MemoryServer::new();
/// let backend = server.connect("alice");
/// let (editor, handle, mut editor_events) = MemoryEditor::new();
/// let mut client = EditorClient::new(ClientConfig::default(), editor, backend);
///
/// client.handle_backend_event(BackendEvent::Ready).unwrap();
/// handle.insert(0, "Hi");
/// while let Ok(event) = editor_events.try_recv() {
///     client.handle_editor_event(event).unwrap();
/// }
/// assert_eq!(server.document(), "Hi");
/// ```
pub struct EditorClient<E: EditorAdapter, B: DatabaseAdapter> {
    config: ClientConfig,
    editor: E,
    backend: B,
    machine: StateMachine<PlainTextOperation>,
    undo: UndoManager,
    presence: PresenceRegistry,
    cursor: Option<Cursor>,
    /// Length of the document as this client has seen it. The editor's own
    /// text may already contain edits whose events are still queued.
    document_len: usize,
    focused: bool,
    initialized: bool,
    disposed: bool,
    /// A local edit happened since the last flush.
    edited_this_tick: bool,
    /// A cursor send is waiting for the next flush.
    deferred_cursor: bool,
    event_tx: broadcast::Sender<ClientEvent>,
}

impl<E: EditorAdapter, B: DatabaseAdapter> EditorClient<E, B> {
    /// Create a client and announce the user to the backend.
    pub fn new(config: ClientConfig, mut editor: E, mut backend: B) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        backend.set_user_id(&config.user_id);
        if let Some(color) = &config.user_color {
            backend.set_user_color(color);
        }
        if let Some(name) = &config.user_name {
            backend.set_user_name(name);
        }
        editor.register_undo_redo();
        let document_len = editor.get_text().chars().count();

        Self {
            undo: UndoManager::new(config.max_undo_items),
            config,
            editor,
            backend,
            machine: StateMachine::new(),
            presence: PresenceRegistry::new(),
            cursor: None,
            document_len,
            focused: false,
            initialized: false,
            disposed: false,
            edited_this_tick: false,
            deferred_cursor: false,
            event_tx,
        }
    }

    /// The configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The wrapped editor.
    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Mutable access to the wrapped editor.
    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the wrapped backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Current sync protocol state.
    pub fn state(&self) -> &ProtocolState<PlainTextOperation> {
        self.machine.state()
    }

    /// Whether every local edit has been acknowledged.
    pub fn is_synchronized(&self) -> bool {
        self.machine.is_synchronized()
    }

    /// Whether the backend has loaded the document.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The local cursor as last read from the editor.
    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    pub fn remote_clients(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Whether an undo step is available.
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    /// Whether a redo step is available.
    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Subscribe to client events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.event_tx.send(event);
    }

    fn emit_sync_change(&self, was_synchronized: bool) {
        let now = self.machine.is_synchronized();
        if now != was_synchronized {
            debug!(synced = now, "sync status changed");
            self.emit(ClientEvent::Synced(now));
        }
    }

    /// Broadcast an error together with the current document.
    pub fn report_error(&self, err: &ClientError) {
        self.emit(ClientEvent::Error {
            message: err.to_string(),
            operation: None,
            document: Some(self.editor.get_text()),
        });
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(ClientError::Disposed);
        }
        Ok(())
    }

    fn bridge(&mut self) -> SyncBridge<'_, E, B> {
        SyncBridge::new(
            &mut self.editor,
            &mut self.backend,
            &mut self.undo,
            &mut self.cursor,
            &mut self.document_len,
        )
    }

    fn apply_client(&mut self, operation: PlainTextOperation) -> Result<()> {
        let was_synchronized = self.machine.is_synchronized();
        let mut machine = std::mem::take(&mut self.machine);
        let mut bridge = self.bridge();
        let result = machine.apply_client(operation, &mut bridge);
        let outcome = bridge.finish();
        self.machine = machine;
        result?;
        outcome?;
        self.emit_sync_change(was_synchronized);
        Ok(())
    }

    // === Editor side ===

    /// Handle one event from the editor.
    pub fn handle_editor_event(&mut self, event: EditorEvent) -> Result<()> {
        let unredo = matches!(event, EditorEvent::Undo | EditorEvent::Redo);
        let result = self.on_editor_event(event);
        if unredo {
            self.editor.undo_redo_handled();
        }
        result
    }

    fn on_editor_event(&mut self, event: EditorEvent) -> Result<()> {
        self.ensure_live()?;
        match event {
            EditorEvent::Change { operation, inverse } => self.on_change(operation, inverse),
            EditorEvent::Cursor => self.on_cursor_activity(),
            EditorEvent::Focus => {
                self.focused = true;
                self.on_cursor_activity()
            }
            EditorEvent::Blur => {
                self.cursor = None;
                self.deferred_cursor = false;
                self.send_cursor(None);
                self.focused = false;
                Ok(())
            }
            EditorEvent::Undo => self.undo().map(|_| ()),
            EditorEvent::Redo => self.redo().map(|_| ()),
            EditorEvent::Error { message } => {
                warn!(%message, "editor reported an error");
                self.emit(ClientEvent::Error {
                    message,
                    operation: None,
                    document: Some(self.editor.get_text()),
                });
                Ok(())
            }
        }
    }

    fn on_change(&mut self, operation: PlainTextOperation, inverse: PlainTextOperation) -> Result<()> {
        if !self.initialized {
            error!(%operation, "local change before the document was loaded");
            return Err(ClientError::NotInitialized);
        }

        self.check_local(&operation)?;
        if inverse.base_length() != operation.target_length()
            || inverse.target_length() != operation.base_length()
        {
            error!(%operation, %inverse, "inverse does not revert the change");
            return Err(OperationError::BaseLengthMismatch {
                expected: operation.target_length(),
                actual: inverse.base_length(),
            }
            .into());
        }

        let cursor_before = self.cursor;
        self.cursor = self.editor.get_cursor();

        let compose = self
            .undo
            .last_undo()
            .map_or(false, |top| inverse.should_be_composed_with_inverted(&top.operation));
        let metadata = OperationMetadata::new(self.cursor, cursor_before);
        self.undo.add(WrappedOperation::new(inverse, Some(metadata)), compose)?;

        self.document_len = operation.target_length();
        self.edited_this_tick = true;
        self.apply_client(operation)
    }

    /// Check that a local operation applies to the document this client has
    /// seen and can queue behind the edits still in flight.
    fn check_local(&self, operation: &PlainTextOperation) -> Result<()> {
        if operation.base_length() != self.document_len {
            warn!(%operation, document_len = self.document_len, "local operation has the wrong length");
            return Err(OperationError::BaseLengthMismatch {
                expected: operation.base_length(),
                actual: self.document_len,
            }
            .into());
        }
        let pending = self.machine.buffer().or(self.machine.outstanding());
        if let Some(pending) = pending {
            if pending.target_length() != operation.base_length() {
                return Err(OperationError::ComposeLengthMismatch {
                    target: pending.target_length(),
                    base: operation.base_length(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Everything an undo or redo step needs before it is popped: the step
    /// must fit the document, and its inverse becomes the opposite step.
    fn prepare_step(&self, step: &WrappedOperation) -> Result<WrappedOperation> {
        self.check_local(&step.operation)?;
        self.editor.invert_operation(step)
    }

    fn on_cursor_activity(&mut self) -> Result<()> {
        let previous = self.cursor;
        self.cursor = self.editor.get_cursor();
        if !self.focused || (previous.is_some() && previous == self.cursor) {
            return Ok(());
        }

        if self.edited_this_tick {
            trace!("deferring cursor until the edit settles");
            self.deferred_cursor = true;
        } else {
            self.send_cursor(self.cursor);
        }
        Ok(())
    }

    fn send_cursor(&mut self, cursor: Option<Cursor>) {
        if !self.machine.is_synchronized() {
            trace!("not synchronized, holding cursor back");
            return;
        }
        self.backend.send_cursor(cursor.as_ref());
    }

    /// End the current tick: send a cursor update that was held back because
    /// of a local edit in the same tick.
    pub fn flush_deferred_cursor(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.edited_this_tick = false;
        if std::mem::take(&mut self.deferred_cursor) && self.focused {
            self.cursor = self.editor.get_cursor();
            self.send_cursor(self.cursor);
        }
        Ok(())
    }

    /// Undo the newest step. Returns whether anything was undone.
    ///
    /// A step that cannot be applied leaves the document, the stacks and
    /// the protocol state untouched.
    pub fn undo(&mut self) -> Result<bool> {
        self.ensure_live()?;
        let inverse = match self.undo.last_undo() {
            Some(step) => self.prepare_step(step)?,
            None => return Ok(false),
        };

        let was_synchronized = self.machine.is_synchronized();
        let Self {
            editor,
            backend,
            machine,
            undo,
            cursor,
            document_len,
            ..
        } = self;
        undo.perform_undo(|manager, operation| {
            let bridge = SyncBridge::new(editor, backend, manager, cursor, document_len);
            apply_unredo(machine, bridge, operation, inverse)
        })?;

        debug!(undo_depth = self.undo.undo_depth(), "undo applied");
        self.emit_sync_change(was_synchronized);
        self.emit(ClientEvent::Undo);
        Ok(true)
    }

    /// Redo the newest undone step. Returns whether anything was redone.
    pub fn redo(&mut self) -> Result<bool> {
        self.ensure_live()?;
        let inverse = match self.undo.last_redo() {
            Some(step) => self.prepare_step(step)?,
            None => return Ok(false),
        };

        let was_synchronized = self.machine.is_synchronized();
        let Self {
            editor,
            backend,
            machine,
            undo,
            cursor,
            document_len,
            ..
        } = self;
        undo.perform_redo(|manager, operation| {
            let bridge = SyncBridge::new(editor, backend, manager, cursor, document_len);
            apply_unredo(machine, bridge, operation, inverse)
        })?;

        debug!(redo_depth = self.undo.redo_depth(), "redo applied");
        self.emit_sync_change(was_synchronized);
        self.emit(ClientEvent::Redo);
        Ok(true)
    }

    // === Backend side ===

    /// Handle one event from the backend.
    pub fn handle_backend_event(&mut self, event: BackendEvent) -> Result<()> {
        self.ensure_live()?;
        match event {
            BackendEvent::Ready => {
                self.mark_initialized();
                if self.backend.is_history_empty() {
                    if let Some(text) = self.config.default_text.clone() {
                        debug!("seeding empty document with default text");
                        self.editor.set_text(&text);
                    }
                }
                self.emit(ClientEvent::Ready);
                Ok(())
            }
            BackendEvent::InitialRevision => {
                self.mark_initialized();
                Ok(())
            }
            BackendEvent::Operation(operation) => {
                let mut machine = std::mem::take(&mut self.machine);
                let mut bridge = self.bridge();
                let result = machine.apply_server(operation, &mut bridge);
                let outcome = bridge.finish();
                self.machine = machine;
                result?;
                outcome
            }
            BackendEvent::Acknowledge => {
                let was_synchronized = self.machine.is_synchronized();
                let mut machine = std::mem::take(&mut self.machine);
                let mut bridge = self.bridge();
                let result = machine.server_ack(&mut bridge);
                let outcome = bridge.finish();
                self.machine = machine;
                result?;
                outcome?;

                if self.machine.is_synchronized() && self.focused {
                    self.cursor = self.editor.get_cursor();
                    self.send_cursor(self.cursor);
                }
                self.emit_sync_change(was_synchronized);
                Ok(())
            }
            BackendEvent::Retry => {
                let mut machine = std::mem::take(&mut self.machine);
                let mut bridge = self.bridge();
                let result = machine.server_retry(&mut bridge);
                let outcome = bridge.finish();
                self.machine = machine;
                result?;
                outcome
            }
            BackendEvent::CursorChange {
                client_id,
                cursor,
                user_color,
                user_name,
            } => {
                self.on_remote_cursor(client_id, cursor, user_color, user_name);
                Ok(())
            }
            BackendEvent::Error {
                err,
                operation,
                document,
            } => {
                error!(%err, "backend reported an error");
                self.emit(ClientEvent::Error {
                    message: err,
                    operation,
                    document,
                });
                Ok(())
            }
        }
    }

    fn mark_initialized(&mut self) {
        if !self.initialized {
            self.initialized = true;
            self.editor.set_initiated(true);
        }
    }

    fn on_remote_cursor(
        &mut self,
        client_id: String,
        cursor: Option<Cursor>,
        user_color: Option<String>,
        user_name: Option<String>,
    ) {
        if self.backend.is_current_user(&client_id) || !self.machine.is_synchronized() {
            return;
        }

        let client = self.presence.get_or_create(&client_id);
        if let Some(color) = user_color {
            client.set_color(color);
        }
        if let Some(name) = user_name {
            client.set_name(name);
        }
        match cursor {
            Some(cursor) => client.update_cursor(cursor, &mut self.editor),
            None => client.remove_cursor(),
        }

        trace!(%client_id, ?cursor, "remote cursor updated");
        self.emit(ClientEvent::RemoteCursor { client_id, cursor });
    }

    /// Stop the session. Idempotent; fails while an undo or redo is running.
    pub fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.undo.dispose()?;
        self.machine.dispose();
        self.presence.clear();
        self.disposed = true;
        debug!(user_id = %self.config.user_id, "editor client disposed");
        Ok(())
    }
}

/// Apply a popped undo or redo step.
///
/// `inverse` goes back on the opposite stack, the editor and cursor jump to
/// the step's result, and the step is sent like any local edit.
fn apply_unredo<E: EditorAdapter, B: DatabaseAdapter>(
    machine: &mut StateMachine<PlainTextOperation>,
    mut bridge: SyncBridge<'_, E, B>,
    operation: WrappedOperation,
    inverse: WrappedOperation,
) -> Result<()> {
    bridge.undo.add(inverse, false)?;

    bridge.editor.apply_operation(&operation.operation)?;
    *bridge.document_len = operation.operation.target_length();
    *bridge.cursor = operation.cursor_after();
    if let Some(cursor) = *bridge.cursor {
        bridge.editor.set_cursor(cursor);
    }

    machine.apply_client(operation.operation, &mut bridge)?;
    bridge.finish()
}
