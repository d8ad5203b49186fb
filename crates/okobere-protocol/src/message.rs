//! Message framing: one protocol message per text line.
//!
//! The wire form is `COMMAND|param1|param2|...` with no escaping. A
//! parameter therefore can never contain `|` or a newline; callers that
//! build outbound messages from user input (room names, nicknames) are
//! responsible for not passing those characters through.

use std::fmt;

use crate::ProtocolError;
use crate::command::{self, MessageKind};

/// Largest accepted inbound line, in bytes (terminator excluded).
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Largest accepted number of parameters after the command.
pub const MAX_PARAMETERS: usize = 100;

const DELIMITER: char = '|';

/// A single protocol message: a command label plus ordered parameters.
///
/// Messages are immutable once built. They move from the router into a
/// queue and from the queue into exactly one consumer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    /// The command label, e.g. `"LOGIN"` or `"DEAL_CARDS"`.
    pub command: String,
    /// Positional parameters. May be empty.
    pub params: Vec<String>,
}

impl Message {
    /// Builds a message from a command and its parameters.
    pub fn new<I, S>(command: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a message with no parameters.
    pub fn bare(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: Vec::new(),
        }
    }

    /// Parses one line into a message.
    ///
    /// A trailing `\n` / `\r\n` is ignored. The first `|`-separated token
    /// is the command; the rest are parameters. A line without any `|` is a
    /// command with zero parameters.
    ///
    /// # Errors
    /// - [`ProtocolError::Empty`] for an empty line
    /// - [`ProtocolError::TooLong`] above [`MAX_MESSAGE_SIZE`] bytes
    /// - [`ProtocolError::TooManyParameters`] above [`MAX_PARAMETERS`]
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }
        if line.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::TooLong(line.len()));
        }

        let mut parts = line.split(DELIMITER);
        // `split` always yields at least one item, even for "".
        let command = parts.next().unwrap_or_default().to_string();
        let params: Vec<String> = parts.map(str::to_string).collect();
        if params.len() > MAX_PARAMETERS {
            return Err(ProtocolError::TooManyParameters(params.len()));
        }

        Ok(Self { command, params })
    }

    /// Renders the wire form, without a line terminator.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Returns parameter `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Returns `true` if this message carries the given command.
    pub fn is(&self, command: &str) -> bool {
        self.command == command
    }

    /// Returns `true` for `ERROR` messages.
    pub fn is_error(&self) -> bool {
        self.is(command::ERROR)
    }

    /// Human-readable text of an `ERROR` message.
    ///
    /// Returns `None` for non-error messages. An `ERROR` with no parameter
    /// yields an empty string.
    pub fn error_text(&self) -> Option<&str> {
        self.is_error().then(|| self.param(0).unwrap_or_default())
    }

    /// Where the router should deliver this message.
    pub fn kind(&self) -> MessageKind {
        command::classify(&self.command)
    }

    // -- Outbound constructors -------------------------------------------

    /// `LOGIN|nick` or `LOGIN|nick|token` when resuming a session.
    pub fn login(nickname: &str, token: Option<&str>) -> Self {
        match token {
            Some(token) => Self::new(command::LOGIN, [nickname, token]),
            None => Self::new(command::LOGIN, [nickname]),
        }
    }

    pub fn ping() -> Self {
        Self::bare(command::PING)
    }

    pub fn disconnect() -> Self {
        Self::bare(command::DISCONNECT)
    }

    pub fn room_list() -> Self {
        Self::bare(command::ROOM_LIST)
    }

    pub fn create_room(name: &str) -> Self {
        Self::new(command::CREATE_ROOM, [name])
    }

    pub fn join_room(room_id: u32) -> Self {
        Self::new(command::JOIN_ROOM, [room_id.to_string()])
    }

    pub fn leave_room() -> Self {
        Self::bare(command::LEAVE_ROOM)
    }

    pub fn hit() -> Self {
        Self::bare(command::HIT)
    }

    pub fn stand() -> Self {
        Self::bare(command::STAND)
    }

    pub fn reconnect_accept() -> Self {
        Self::bare(command::RECONNECT_ACCEPT)
    }

    pub fn reconnect_decline() -> Self {
        Self::bare(command::RECONNECT_DECLINE)
    }

    /// The acknowledgement the server expects after the given async event,
    /// or `None` if that event is not acknowledged.
    pub fn ack_for(event_command: &str) -> Option<Self> {
        let ack = match event_command {
            command::GAME_STATE => command::ACK_GAME_STATE,
            command::DEAL_CARDS => command::ACK_DEAL_CARDS,
            command::ROUND_END => command::ACK_ROUND_END,
            command::GAME_END => command::ACK_GAME_END,
            _ => return None,
        };
        Some(Self::bare(ack))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for param in &self.params {
            write!(f, "{DELIMITER}{param}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // decode()
    // =====================================================================

    #[test]
    fn test_decode_card_has_one_param() {
        let msg = Message::decode("CARD|SRDCE-ESO").unwrap();
        assert_eq!(msg.command, "CARD");
        assert_eq!(msg.params, vec!["SRDCE-ESO"]);
    }

    #[test]
    fn test_decode_no_delimiter_has_zero_params() {
        let msg = Message::decode("JOINED").unwrap();
        assert_eq!(msg.command, "JOINED");
        assert!(msg.params.is_empty());
    }

    #[test]
    fn test_decode_strips_line_terminator() {
        let msg = Message::decode("OK|abc123\r\n").unwrap();
        assert_eq!(msg, Message::new("OK", ["abc123"]));
    }

    #[test]
    fn test_decode_keeps_empty_params() {
        let msg = Message::decode("ROUND_END|YOU|20|18||").unwrap();
        assert_eq!(msg.params.len(), 5);
        assert_eq!(msg.param(3), Some(""));
        assert_eq!(msg.param(4), Some(""));
    }

    #[test]
    fn test_decode_empty_returns_empty_error() {
        assert_eq!(Message::decode(""), Err(ProtocolError::Empty));
        assert_eq!(Message::decode("\n"), Err(ProtocolError::Empty));
    }

    #[test]
    fn test_decode_at_size_limit_succeeds() {
        let line = format!("X|{}", "a".repeat(MAX_MESSAGE_SIZE - 2));
        assert_eq!(line.len(), MAX_MESSAGE_SIZE);
        assert!(Message::decode(&line).is_ok());
    }

    #[test]
    fn test_decode_over_size_limit_returns_too_long() {
        let line = "a".repeat(MAX_MESSAGE_SIZE + 1);
        assert_eq!(
            Message::decode(&line),
            Err(ProtocolError::TooLong(MAX_MESSAGE_SIZE + 1))
        );
    }

    #[test]
    fn test_decode_parameter_limit() {
        let at_limit = format!("X{}", "|p".repeat(MAX_PARAMETERS));
        assert_eq!(Message::decode(&at_limit).unwrap().params.len(), MAX_PARAMETERS);

        let over = format!("X{}", "|p".repeat(MAX_PARAMETERS + 1));
        assert_eq!(
            Message::decode(&over),
            Err(ProtocolError::TooManyParameters(MAX_PARAMETERS + 1))
        );
    }

    // =====================================================================
    // encode()
    // =====================================================================

    #[test]
    fn test_encode_joins_with_delimiter() {
        let msg = Message::new("DEAL_CARDS", ["2", "KULE-SEDM", "LISTY-ESO"]);
        assert_eq!(msg.encode(), "DEAL_CARDS|2|KULE-SEDM|LISTY-ESO");
    }

    #[test]
    fn test_encode_then_decode_preserves_message() {
        for msg in [
            Message::bare("PING"),
            Message::login("alice", Some("tok1")),
            Message::new("ROOM", ["3", "Friday night", "1", "2", "WAITING"]),
            Message::new("X", ["", "", ""]),
        ] {
            assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
        }
    }

    // =====================================================================
    // Accessors and constructors
    // =====================================================================

    #[test]
    fn test_error_text_only_for_error_messages() {
        let err = Message::decode("ERROR|Room is full").unwrap();
        assert!(err.is_error());
        assert_eq!(err.error_text(), Some("Room is full"));

        assert_eq!(Message::bare("ERROR").error_text(), Some(""));
        assert_eq!(Message::bare("OK").error_text(), None);
    }

    #[test]
    fn test_login_with_and_without_token() {
        assert_eq!(Message::login("bob", None).encode(), "LOGIN|bob");
        assert_eq!(Message::login("bob", Some("s1")).encode(), "LOGIN|bob|s1");
    }

    #[test]
    fn test_ack_for_acknowledged_events_only() {
        assert_eq!(Message::ack_for("GAME_STATE").unwrap().encode(), "ACK_GAME_STATE");
        assert_eq!(Message::ack_for("DEAL_CARDS").unwrap().encode(), "ACK_DEAL_CARDS");
        assert_eq!(Message::ack_for("ROUND_END").unwrap().encode(), "ACK_ROUND_END");
        assert_eq!(Message::ack_for("GAME_END").unwrap().encode(), "ACK_GAME_END");
        assert!(Message::ack_for("CARD").is_none());
        assert!(Message::ack_for("YOUR_TURN").is_none());
    }

    #[test]
    fn test_kind_uses_command_classification() {
        assert_eq!(Message::bare("PONG").kind(), MessageKind::Heartbeat);
        assert_eq!(Message::bare("YOUR_TURN").kind(), MessageKind::AsyncEvent);
        assert_eq!(Message::bare("OK").kind(), MessageKind::SyncReply);
    }
}
