//! # concord-sync
//!
//! Client side of the OT synchronization protocol.
//!
//! A client keeps at most one operation in flight. While it waits for the
//! server to acknowledge it, further local edits are composed into a buffer
//! and incoming server operations are transformed so they apply cleanly on
//! top of the local document.
//!
//! ```text
//! On local edit a:
//!   Synchronized          send(a)             -> AwaitingConfirm(a)
//!   AwaitingConfirm(o)                        -> AwaitingWithBuffer(o, a)
//!   AwaitingWithBuffer(o, b)                  -> AwaitingWithBuffer(o, b ∘ a)
//!
//! On server ack:
//!   AwaitingConfirm(o)                        -> Synchronized
//!   AwaitingWithBuffer(o, b)  send(b)         -> AwaitingConfirm(b)
//! ```
//!
//! # Example
//!
//! ```rust
//! use concord_core::PlainTextOperation;
//! use concord_sync::{StateMachine, TransitionHandler};
//!
//! struct Log(Vec<String>);
//!
//! impl TransitionHandler<PlainTextOperation> for Log {
//!     fn send_operation(&mut self, op: &PlainTextOperation) {
//!         self.0.push(format!("send {}", op));
//!     }
//!     fn apply_operation(&mut self, op: &PlainTextOperation) {
//!         self.0.push(format!("apply {}", op));
//!     }
//! }
//!
//! let mut machine = StateMachine::new();
//! let mut log = Log(Vec::new());
//! machine.apply_client(PlainTextOperation::new().insert("hi"), &mut log).unwrap();
//! machine.server_ack(&mut log).unwrap();
//! assert!(machine.is_synchronized());
//! assert_eq!(log.0, vec!["send insert 'hi'"]);
//! ```

pub mod error;
pub mod machine;
pub mod state;

pub use error::{Result, SyncError};
pub use machine::{StateMachine, TransitionHandler};
pub use state::ProtocolState;
