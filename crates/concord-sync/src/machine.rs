//! The client synchronization state machine.
//!
//! ```text
//!                  apply_client                  apply_client
//!  Synchronized ----------------> AwaitingConfirm ------------> AwaitingWithBuffer
//!       ^                          |        ^                         |
//!       |        server_ack        |        |  server_ack / retry     |
//!       +--------------------------+        +-------------------------+
//! ```
//!
//! Server operations are accepted in every state; while something is in
//! flight they are transformed against the outstanding operation (and the
//! buffer) before they reach the editor.

use crate::error::{Result, SyncError};
use crate::state::ProtocolState;
use concord_core::Operational;
use tracing::{debug, error, trace};

/// Side effects requested by the state machine.
pub trait TransitionHandler<O> {
    /// Send an operation to the server.
    fn send_operation(&mut self, operation: &O);

    /// Apply a (rebased) server operation to the local document.
    fn apply_operation(&mut self, operation: &O);
}

/// Tracks outstanding and buffered local operations for one session.
#[derive(Clone, Debug)]
pub struct StateMachine<O: Operational> {
    state: ProtocolState<O>,
    disposed: bool,
}

impl<O: Operational> Default for StateMachine<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Operational> StateMachine<O> {
    pub fn new() -> Self {
        Self {
            state: ProtocolState::Synchronized,
            disposed: false,
        }
    }

    /// The current state.
    pub fn state(&self) -> &ProtocolState<O> {
        &self.state
    }

    /// Whether nothing is in flight.
    pub fn is_synchronized(&self) -> bool {
        self.state.is_synchronized()
    }

    pub fn is_awaiting_confirm(&self) -> bool {
        self.state.is_awaiting_confirm()
    }

    pub fn is_awaiting_with_buffer(&self) -> bool {
        self.state.is_awaiting_with_buffer()
    }

    /// The operation in flight, if any.
    pub fn outstanding(&self) -> Option<&O> {
        self.state.outstanding()
    }

    /// Local edits queued behind the one in flight.
    pub fn buffer(&self) -> Option<&O> {
        self.state.buffer()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Stop accepting transitions. Idempotent.
    pub fn dispose(&mut self) {
        if !self.disposed {
            debug!(state = %self.state, "disposing state machine");
            self.disposed = true;
        }
    }

    fn ensure_live(&self) -> Result<(), O::Error> {
        if self.disposed {
            error!("transition attempted on a disposed state machine");
            return Err(SyncError::Disposed);
        }
        Ok(())
    }

    fn replace(&mut self, next: ProtocolState<O>) {
        trace!(from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    /// A local edit was made.
    pub fn apply_client<H>(&mut self, operation: O, handler: &mut H) -> Result<(), O::Error>
    where
        H: TransitionHandler<O> + ?Sized,
    {
        self.ensure_live()?;

        let next = match &self.state {
            ProtocolState::Synchronized => {
                handler.send_operation(&operation);
                ProtocolState::AwaitingConfirm {
                    outstanding: operation,
                }
            }
            ProtocolState::AwaitingConfirm { outstanding } => ProtocolState::AwaitingWithBuffer {
                outstanding: outstanding.clone(),
                buffer: operation,
            },
            ProtocolState::AwaitingWithBuffer { outstanding, buffer } => {
                let buffer = buffer.compose(&operation)?;
                ProtocolState::AwaitingWithBuffer {
                    outstanding: outstanding.clone(),
                    buffer,
                }
            }
        };

        self.replace(next);
        Ok(())
    }

    /// An operation from another client arrived.
    pub fn apply_server<H>(&mut self, operation: O, handler: &mut H) -> Result<(), O::Error>
    where
        H: TransitionHandler<O> + ?Sized,
    {
        self.ensure_live()?;

        match &self.state {
            ProtocolState::Synchronized => {
                handler.apply_operation(&operation);
            }
            ProtocolState::AwaitingConfirm { outstanding } => {
                let (outstanding, rebased) = outstanding.transform(&operation)?;
                handler.apply_operation(&rebased);
                self.replace(ProtocolState::AwaitingConfirm { outstanding });
            }
            ProtocolState::AwaitingWithBuffer { outstanding, buffer } => {
                let (outstanding, rebased) = outstanding.transform(&operation)?;
                let (buffer, rebased) = buffer.transform(&rebased)?;
                handler.apply_operation(&rebased);
                self.replace(ProtocolState::AwaitingWithBuffer { outstanding, buffer });
            }
        }

        Ok(())
    }

    /// The server accepted the outstanding operation.
    pub fn server_ack<H>(&mut self, handler: &mut H) -> Result<(), O::Error>
    where
        H: TransitionHandler<O> + ?Sized,
    {
        self.ensure_live()?;

        let next = match &self.state {
            ProtocolState::Synchronized => {
                error!("acknowledgement received with no pending operation");
                return Err(SyncError::NoPendingOperation);
            }
            ProtocolState::AwaitingConfirm { .. } => ProtocolState::Synchronized,
            ProtocolState::AwaitingWithBuffer { buffer, .. } => {
                debug!("outstanding operation acknowledged, sending buffer");
                handler.send_operation(buffer);
                ProtocolState::AwaitingConfirm {
                    outstanding: buffer.clone(),
                }
            }
        };

        self.replace(next);
        Ok(())
    }

    /// The server rejected the outstanding operation; send it again.
    pub fn server_retry<H>(&mut self, handler: &mut H) -> Result<(), O::Error>
    where
        H: TransitionHandler<O> + ?Sized,
    {
        self.ensure_live()?;

        match &self.state {
            ProtocolState::Synchronized => {
                error!("retry requested with no pending operation");
                Err(SyncError::NoPendingOperation)
            }
            ProtocolState::AwaitingConfirm { outstanding } => {
                debug!("resending outstanding operation");
                handler.send_operation(outstanding);
                Ok(())
            }
            ProtocolState::AwaitingWithBuffer { outstanding, buffer } => {
                let outstanding = outstanding.compose(buffer)?;
                debug!("resending outstanding operation merged with buffer");
                handler.send_operation(&outstanding);
                self.replace(ProtocolState::AwaitingConfirm { outstanding });
                Ok(())
            }
        }
    }
}
