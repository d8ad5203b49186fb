//! Unified error type for the Oko Bere client.

use okobere_protocol::ProtocolError;
use okobere_session::SessionError;
use okobere_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `okobere` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (connect, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A reply was malformed or carried invalid values.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The operation doesn't fit the current session state.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The server answered with `ERROR|text`. Never retried automatically.
    #[error("server error: {0}")]
    Server(String),

    /// No reply with the given command arrived in time.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// There is no live connection (not connected yet, or reconnecting).
    #[error("not connected")]
    NotConnected,

    /// The server answered with something the operation can't use.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// A nickname or room name can't be sent as-is.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `retry_reconnect` while an automatic or manual attempt is running.
    #[error("reconnect already in progress")]
    ReconnectInProgress,
}
