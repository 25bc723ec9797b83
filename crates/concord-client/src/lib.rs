//! # concord-client
//!
//! Collaborative editor client for the Concord OT engine.
//!
//! This crate provides:
//! - `EditorClient`: connects an editor to a backend through the sync protocol
//! - `UndoManager`: undo/redo that survives concurrent remote edits
//! - Adapter contracts for editors (`EditorAdapter`) and backends (`DatabaseAdapter`)
//! - Remote cursor tracking
//! - `ClientDriver`: an async event loop
//! - In-memory adapters for tests and simulation
//!
//! ## Example
//!
//! ```rust
//! use concord_client::{ClientConfigBuilder, ClientDriver, EditorClient};
//! use concord_client::memory::{MemoryEditor, MemoryServer};
//!
//! let server = MemoryServer::new();
//!
//! let (editor, alice, alice_events) = MemoryEditor::new();
//! let config = ClientConfigBuilder::new().user_id("alice").build();
//! let mut alice_driver =
//!     ClientDriver::new(EditorClient::new(config, editor, server.connect("alice")), alice_events);
//!
//! let (editor, bob, bob_events) = MemoryEditor::new();
//! let config = ClientConfigBuilder::new().user_id("bob").build();
//! let mut bob_driver =
//!     ClientDriver::new(EditorClient::new(config, editor, server.connect("bob")), bob_events);
//!
//! alice_driver.pump();
//! bob_driver.pump();
//!
//! alice.insert(0, "Hello");
//! alice_driver.pump();
//! bob_driver.pump();
//!
//! assert_eq!(bob.text(), "Hello");
//! ```

pub mod adapter;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod memory;
pub mod presence;
pub mod undo;

pub use adapter::{
    BackendEvent, BackendEventSource, CursorHandle, DatabaseAdapter, EditorAdapter, EditorEvent,
};
pub use client::{ClientEvent, EditorClient};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_MAX_UNDO_ITEMS};
pub use driver::ClientDriver;
pub use error::{ClientError, Result, UndoError};
pub use presence::{PresenceRegistry, RemoteClient};
pub use undo::{UndoManager, UndoMode};
