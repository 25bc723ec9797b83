//! Async event loop for an editor client.

use crate::adapter::{BackendEvent, BackendEventSource, DatabaseAdapter, EditorAdapter, EditorEvent};
use crate::client::EditorClient;
use crate::error::Result;
use tokio::sync::mpsc;
use tracing::{trace, warn};

enum Incoming {
    Editor(EditorEvent),
    Backend(BackendEvent),
    Closed,
}

/// Feeds editor and backend events into an [`EditorClient`].
///
/// Editor events that are ready at the same time form one tick. A cursor
/// update caused by an edit in that tick is sent only after the tick ends.
pub struct ClientDriver<E, B>
where
    E: EditorAdapter,
    B: DatabaseAdapter + BackendEventSource,
{
    client: EditorClient<E, B>,
    editor_events: mpsc::UnboundedReceiver<EditorEvent>,
}

impl<E, B> ClientDriver<E, B>
where
    E: EditorAdapter,
    B: DatabaseAdapter + BackendEventSource,
{
    /// Drive `client` with events from `editor_events` and its backend.
    pub fn new(client: EditorClient<E, B>, editor_events: mpsc::UnboundedReceiver<EditorEvent>) -> Self {
        Self {
            client,
            editor_events,
        }
    }

    /// The driven client.
    pub fn client(&self) -> &EditorClient<E, B> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut EditorClient<E, B> {
        &mut self.client
    }

    /// Stop driving and hand the client back.
    pub fn into_inner(self) -> EditorClient<E, B> {
        self.client
    }

    fn handle_editor_tick(&mut self, first: EditorEvent) -> Result<()> {
        self.client.handle_editor_event(first)?;
        while let Ok(event) = self.editor_events.try_recv() {
            self.client.handle_editor_event(event)?;
        }
        Ok(())
    }

    /// Wait for the next event and handle it.
    ///
    /// Returns `Ok(false)` once both event sources are closed.
    pub async fn step(&mut self) -> Result<bool> {
        let incoming = {
            let backend = self.client.backend_mut();
            tokio::select! {
                // Local edits first: the editor text already contains them.
                biased;
                Some(event) = self.editor_events.recv() => Incoming::Editor(event),
                Some(event) = backend.next_event() => Incoming::Backend(event),
                else => Incoming::Closed,
            }
        };

        match incoming {
            Incoming::Closed => return Ok(false),
            Incoming::Editor(event) => self.handle_editor_tick(event)?,
            Incoming::Backend(event) => self.client.handle_backend_event(event)?,
        }

        tokio::task::yield_now().await;
        self.client.flush_deferred_cursor()?;
        Ok(true)
    }

    /// Handle events until both sources close or the client is disposed.
    pub async fn run(&mut self) {
        loop {
            match self.step().await {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    warn!(%err, "failed to handle event");
                    self.client.report_error(&err);
                    if self.client.is_disposed() {
                        break;
                    }
                }
            }
        }
        trace!("client driver stopped");
    }

    /// Handle every event that is ready right now without waiting.
    ///
    /// Returns the number of events handled. Failures are reported on the
    /// client's event channel.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let mut tick = 0;
            while let Ok(event) = self.editor_events.try_recv() {
                self.report(|client| client.handle_editor_event(event));
                tick += 1;
            }
            if tick > 0 {
                self.report(|client| client.flush_deferred_cursor());
            }

            let backend_event = self.client.backend_mut().try_next_event();
            if let Some(event) = backend_event {
                self.report(|client| client.handle_backend_event(event));
                self.report(|client| client.flush_deferred_cursor());
                tick += 1;
            }

            if tick == 0 {
                return handled;
            }
            handled += tick;
        }
    }

    fn report(&mut self, f: impl FnOnce(&mut EditorClient<E, B>) -> Result<()>) {
        if let Err(err) = f(&mut self.client) {
            warn!(%err, "failed to handle event");
            self.client.report_error(&err);
        }
    }
}
