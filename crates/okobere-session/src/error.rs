//! Error types for the session layer.

use crate::ClientState;

/// Errors raised when an operation doesn't fit the current session state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The operation isn't allowed in the current state, e.g. `hit` while
    /// still in the lobby.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ClientState,
    },

    /// `accept_reconnect` / `decline_reconnect` without a pending offer.
    #[error("no reconnect offer is pending")]
    NoPendingReconnect,
}
