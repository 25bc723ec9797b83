//! Other users' cursors as shown in the local editor.

use crate::adapter::{CursorHandle, EditorAdapter};
use concord_core::Cursor;
use std::collections::HashMap;
use tracing::trace;

/// Another user connected to the same document.
pub struct RemoteClient {
    id: String,
    color: Option<String>,
    name: Option<String>,
    cursor: Option<Cursor>,
    handle: Option<Box<dyn CursorHandle>>,
}

impl RemoteClient {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color: None,
            name: None,
            cursor: None,
            handle: None,
        }
    }

    /// The remote client's id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display colour, if the client sent one.
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Display name, if the client sent one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Where the cursor was last drawn.
    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    /// Set the colour used for the next redraw.
    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = Some(color.into());
    }

    /// Set the name used for the next redraw.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Redraw the cursor at a new place.
    pub fn update_cursor<E: EditorAdapter + ?Sized>(&mut self, cursor: Cursor, editor: &mut E) {
        self.remove_cursor();
        self.cursor = Some(cursor);
        self.handle = Some(editor.set_other_cursor(
            &self.id,
            cursor,
            self.color.as_deref(),
            self.name.as_deref(),
        ));
    }

    /// Clear the drawn cursor.
    pub fn remove_cursor(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.clear();
        }
        self.cursor = None;
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("id", &self.id)
            .field("color", &self.color)
            .field("name", &self.name)
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Remote clients seen by one editor client.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    clients: HashMap<String, RemoteClient>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a client by id.
    pub fn get(&self, client_id: &str) -> Option<&RemoteClient> {
        self.clients.get(client_id)
    }

    /// Look up a client, creating it on first sight.
    pub fn get_or_create(&mut self, client_id: &str) -> &mut RemoteClient {
        self.clients.entry(client_id.to_string()).or_insert_with(|| {
            trace!(client_id, "tracking new remote client");
            RemoteClient::new(client_id)
        })
    }

    /// Number of known clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Iterate over known clients in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &RemoteClient> {
        self.clients.values()
    }

    /// Remove every drawn cursor and forget all clients.
    pub fn clear(&mut self) {
        for client in self.clients.values_mut() {
            client.remove_cursor();
        }
        self.clients.clear();
    }
}
