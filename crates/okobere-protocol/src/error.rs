//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in a frame or in the values it
//! carries, not in networking or in session state.

use crate::{MAX_MESSAGE_SIZE, MAX_PARAMETERS};

/// Errors that can occur while decoding frames or validating their contents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The line was empty (or only a line terminator).
    #[error("empty message")]
    Empty,

    /// The line is longer than [`MAX_MESSAGE_SIZE`] bytes.
    #[error("message too long: {0} bytes (max {MAX_MESSAGE_SIZE})")]
    TooLong(usize),

    /// The line carries more than [`MAX_PARAMETERS`] parameters.
    #[error("too many parameters: {0} (max {MAX_PARAMETERS})")]
    TooManyParameters(usize),

    /// The frame is well-formed but its values are not.
    ///
    /// Examples: a card count of 25, an unknown role, a missing parameter.
    /// Messages failing this check never reach the session.
    #[error("invalid {command} data: {reason}")]
    InvalidData {
        /// Command of the offending message.
        command: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl ProtocolError {
    /// Shorthand for building an [`InvalidData`](Self::InvalidData) error.
    pub fn invalid(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            command: command.into(),
            reason: reason.into(),
        }
    }
}
