//! Room listing entries (`ROOMS|count` followed by `ROOM|...` lines).

use serde::{Deserialize, Serialize};

use crate::command;
use crate::{Message, ProtocolError};

/// Valid room identifiers.
pub const ROOM_ID_RANGE: std::ops::RangeInclusive<u32> = 1..=999_999;
/// Most rooms a single listing may announce.
pub const MAX_ROOM_COUNT: u32 = 1000;

/// Lifecycle status the server reports for a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    Playing,
    /// Any status token this client doesn't know.
    Other(String),
}

impl From<&str> for RoomStatus {
    fn from(s: &str) -> Self {
        match s {
            "WAITING" => RoomStatus::Waiting,
            "PLAYING" => RoomStatus::Playing,
            other => RoomStatus::Other(other.to_string()),
        }
    }
}

/// One `ROOM|id|name|playerCount|maxPlayers|status` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: u32,
    pub name: String,
    pub player_count: u32,
    pub max_players: u32,
    pub status: RoomStatus,
}

impl RoomInfo {
    /// Parses a `ROOM` reply.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidData`] if the command is not `ROOM`, fewer
    /// than five parameters are present, or a number doesn't parse.
    pub fn parse(msg: &Message) -> Result<Self, ProtocolError> {
        let invalid = |reason: String| ProtocolError::invalid(command::ROOM, reason);

        if !msg.is(command::ROOM) {
            return Err(invalid(format!("unexpected {}", msg.command)));
        }
        let [id, name, players, max, status, ..] = msg.params.as_slice() else {
            return Err(invalid(format!(
                "expected 5 parameters, got {}",
                msg.params.len()
            )));
        };

        let number = |field: &str, raw: &str| -> Result<u32, ProtocolError> {
            raw.trim()
                .parse()
                .map_err(|_| invalid(format!("{field} is not a number: {raw:?}")))
        };

        let id = number("room id", id.as_str())?;
        if !ROOM_ID_RANGE.contains(&id) {
            return Err(invalid(format!("room id out of range: {id}")));
        }

        Ok(Self {
            id,
            name: name.clone(),
            player_count: number("player count", players.as_str())?,
            max_players: number("max players", max.as_str())?,
            status: RoomStatus::from(status.as_str()),
        })
    }

    pub fn is_full(&self) -> bool {
        self.player_count >= self.max_players
    }

    /// A room can be joined while it is waiting for players and not full.
    pub fn can_join(&self) -> bool {
        self.status == RoomStatus::Waiting && !self.is_full()
    }
}

/// Parses the `ROOMS|count` header of a room listing.
pub fn parse_room_count(msg: &Message) -> Result<u32, ProtocolError> {
    let invalid = |reason: String| ProtocolError::invalid(command::ROOMS, reason);

    if !msg.is(command::ROOMS) {
        return Err(invalid(format!("unexpected {}", msg.command)));
    }
    let raw = msg.param(0).ok_or_else(|| invalid("missing room count".into()))?;
    let count: u32 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(format!("room count is not a number: {raw:?}")))?;
    if count > MAX_ROOM_COUNT {
        return Err(invalid(format!("room count out of range: {count}")));
    }
    Ok(count)
}
