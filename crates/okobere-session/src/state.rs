//! Session lifecycle states and the opponent's side of the table.

use std::fmt;

use okobere_protocol::Card;
use serde::{Deserialize, Serialize};

/// Where the client is in its relationship with the server.
///
/// ```text
///   Disconnected ──connect──→ Connected ──login OK──→ Lobby
///                               │  ↑                    │ ↑
///            RECONNECT_QUERY ───┘  │      ROOM_CREATED/ │ │ LEAVE_ROOM
///            (stays, offer set)    │      JOINED        ↓ │
///                                  │                  InRoom ──GAME_START──→ Playing
///                         reconnect attempt                ↑                  │
///                         (from any state)                 └─PLAYER_DISCONNECTED
///
///   accept offer → Playing        decline offer → Lobby
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientState {
    #[default]
    Disconnected,
    /// Transport is up; not logged in (or resolving a reconnect offer).
    Connected,
    Lobby,
    InRoom,
    Playing,
}

impl ClientState {
    /// `true` for the states that belong to a room.
    pub fn in_room_or_game(self) -> bool {
        matches!(self, ClientState::InRoom | ClientState::Playing)
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClientState::Disconnected => "DISCONNECTED",
            ClientState::Connected => "CONNECTED",
            ClientState::Lobby => "LOBBY",
            ClientState::InRoom => "IN_ROOM",
            ClientState::Playing => "PLAYING",
        })
    }
}

/// What the client knows about the opponent's hand.
///
/// During a round only the number of face-down cards is known; at round
/// end the server may reveal the actual cards. The two views exclude each
/// other, so they're one enum instead of two fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentHand {
    Hidden(u32),
    Revealed(Vec<Card>),
}

impl OpponentHand {
    /// Number of cards the opponent holds, in either view.
    pub fn card_count(&self) -> u32 {
        match self {
            OpponentHand::Hidden(count) => *count,
            OpponentHand::Revealed(cards) => u32::try_from(cards.len()).unwrap_or(u32::MAX),
        }
    }

    /// The revealed cards, if any.
    pub fn revealed(&self) -> Option<&[Card]> {
        match self {
            OpponentHand::Hidden(_) => None,
            OpponentHand::Revealed(cards) => Some(cards),
        }
    }
}

impl Default for OpponentHand {
    fn default() -> Self {
        OpponentHand::Hidden(0)
    }
}
