//! Protocol states.

use std::fmt;

/// Where the client stands relative to the server.
///
/// At most one operation is ever in flight: the `outstanding` one. Local
/// edits made while waiting for its acknowledgement are folded into a single
/// `buffer` that is sent once the server confirms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolState<O> {
    /// Every local edit has been acknowledged.
    Synchronized,
    /// One operation sent, waiting for its acknowledgement.
    AwaitingConfirm { outstanding: O },
    /// One operation sent, more local edits queued behind it.
    AwaitingWithBuffer { outstanding: O, buffer: O },
}

impl<O> ProtocolState<O> {
    pub fn is_synchronized(&self) -> bool {
        matches!(self, ProtocolState::Synchronized)
    }

    pub fn is_awaiting_confirm(&self) -> bool {
        matches!(self, ProtocolState::AwaitingConfirm { .. })
    }

    pub fn is_awaiting_with_buffer(&self) -> bool {
        matches!(self, ProtocolState::AwaitingWithBuffer { .. })
    }

    /// The operation in flight, if any.
    pub fn outstanding(&self) -> Option<&O> {
        match self {
            ProtocolState::Synchronized => None,
            ProtocolState::AwaitingConfirm { outstanding }
            | ProtocolState::AwaitingWithBuffer { outstanding, .. } => Some(outstanding),
        }
    }

    /// Local edits queued behind the outstanding operation.
    pub fn buffer(&self) -> Option<&O> {
        match self {
            ProtocolState::AwaitingWithBuffer { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProtocolState::Synchronized => "Synchronized",
            ProtocolState::AwaitingConfirm { .. } => "AwaitingConfirm",
            ProtocolState::AwaitingWithBuffer { .. } => "AwaitingWithBuffer",
        }
    }
}

impl<O> Default for ProtocolState<O> {
    fn default() -> Self {
        ProtocolState::Synchronized
    }
}

impl<O> fmt::Display for ProtocolState<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
