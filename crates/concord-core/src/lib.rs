//! # concord-core
//!
//! Operational transformation for plain text.
//!
//! This crate provides:
//! - `PlainTextOperation`: retain/insert/delete operations with apply, invert,
//!   compose and transform
//! - `Cursor`: caret and selection positions that follow edits
//! - `WrappedOperation`: operations that remember the cursor around them
//! - The JSON wire format for operations and cursors
//!
//! ## Example
//!
//! ```rust
//! use concord_core::PlainTextOperation;
//!
//! let op = PlainTextOperation::new().retain(6).insert("Me").delete(5);
//! assert_eq!(op.apply("Hello World").unwrap(), "Hello Me");
//!
//! let undo = op.invert("Hello World").unwrap();
//! assert_eq!(undo.apply("Hello Me").unwrap(), "Hello World");
//! ```

pub mod attributes;
pub mod component;
pub mod cursor;
pub mod error;
pub mod operation;
pub mod operational;
pub mod wire;
pub mod wrapped;

pub use attributes::Attributes;
pub use component::TextOperation;
pub use cursor::Cursor;
pub use error::{OperationError, Result};
pub use operation::PlainTextOperation;
pub use operational::Operational;
pub use wrapped::{OperationMetadata, WrappedOperation};
