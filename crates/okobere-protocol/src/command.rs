//! Protocol command vocabulary and message classification.
//!
//! The server never tags a message as "reply" or "event", so the client
//! decides by command name alone. The async set is fixed; everything
//! outside it (including `ERROR` and `GAME_START`) is a synchronous reply
//! that some request caller is waiting for.

// ---------------------------------------------------------------------------
// Outbound (client → server)
// ---------------------------------------------------------------------------

pub const LOGIN: &str = "LOGIN";
pub const PING: &str = "PING";
pub const DISCONNECT: &str = "DISCONNECT";
pub const ROOM_LIST: &str = "ROOM_LIST";
pub const CREATE_ROOM: &str = "CREATE_ROOM";
pub const JOIN_ROOM: &str = "JOIN_ROOM";
pub const LEAVE_ROOM: &str = "LEAVE_ROOM";
pub const HIT: &str = "HIT";
pub const STAND: &str = "STAND";
pub const RECONNECT_ACCEPT: &str = "RECONNECT_ACCEPT";
pub const RECONNECT_DECLINE: &str = "RECONNECT_DECLINE";
pub const ACK_DEAL_CARDS: &str = "ACK_DEAL_CARDS";
pub const ACK_ROUND_END: &str = "ACK_ROUND_END";
pub const ACK_GAME_END: &str = "ACK_GAME_END";
pub const ACK_GAME_STATE: &str = "ACK_GAME_STATE";

// ---------------------------------------------------------------------------
// Inbound synchronous replies
// ---------------------------------------------------------------------------

pub const OK: &str = "OK";
pub const ERROR: &str = "ERROR";
pub const ROOMS: &str = "ROOMS";
pub const ROOM: &str = "ROOM";
pub const ROOM_CREATED: &str = "ROOM_CREATED";
pub const JOINED: &str = "JOINED";
pub const RECONNECT_QUERY: &str = "RECONNECT_QUERY";
pub const GAME_START: &str = "GAME_START";

// ---------------------------------------------------------------------------
// Inbound asynchronous events
// ---------------------------------------------------------------------------

pub const YOUR_TURN: &str = "YOUR_TURN";
pub const OPPONENT_ACTION: &str = "OPPONENT_ACTION";
pub const ROUND_END: &str = "ROUND_END";
pub const GAME_END: &str = "GAME_END";
pub const PLAYER_DISCONNECTED: &str = "PLAYER_DISCONNECTED";
pub const PLAYER_RECONNECTED: &str = "PLAYER_RECONNECTED";
pub const DEAL_CARDS: &str = "DEAL_CARDS";
pub const GAME_STATE: &str = "GAME_STATE";
pub const CARD: &str = "CARD";

/// Heartbeat reply. Never queued.
pub const PONG: &str = "PONG";

/// Commands delivered to the event processor instead of request callers.
pub const ASYNC_COMMANDS: [&str; 9] = [
    YOUR_TURN,
    OPPONENT_ACTION,
    ROUND_END,
    GAME_END,
    PLAYER_DISCONNECTED,
    PLAYER_RECONNECTED,
    DEAL_CARDS,
    GAME_STATE,
    CARD,
];

/// Where an inbound message belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `PONG`: only refreshes liveness, then discarded.
    Heartbeat,
    /// Game event, consumed in order by the event processor.
    AsyncEvent,
    /// Reply to a request (or `ERROR`, or `GAME_START`).
    SyncReply,
}

/// Classifies a command name.
pub fn classify(command: &str) -> MessageKind {
    if command == PONG {
        MessageKind::Heartbeat
    } else if ASYNC_COMMANDS.contains(&command) {
        MessageKind::AsyncEvent
    } else {
        MessageKind::SyncReply
    }
}
