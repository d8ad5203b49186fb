//! Transport layer for the Oko Bere client.
//!
//! Provides [`LineConnection`], a TCP stream framed as newline-terminated
//! text lines, and the [`ConnectionId`] used to correlate log lines
//! across reconnects.

mod connection;
mod error;

pub use connection::{ConnectionConfig, LineConnection, MAX_LINE_LENGTH};
pub use error::TransportError;

use std::fmt;

/// Opaque identifier for a connection.
///
/// Every [`LineConnection`] gets a fresh id, so the logs show which
/// physical connection a message arrived on after the client reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
