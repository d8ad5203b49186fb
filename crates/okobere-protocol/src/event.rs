//! Typed, validated views of server messages.
//!
//! The router moves raw [`Message`]s around; the consumers turn them into
//! these types right before applying them. Parsing is where every value
//! is range-checked, so a message that fails here never touches session
//! state.

use serde::{Deserialize, Serialize};

use crate::card::{Card, parse_card_list};
use crate::command;
use crate::{Message, ProtocolError};

// ---------------------------------------------------------------------------
// Value ranges
// ---------------------------------------------------------------------------

/// Most cards a single `DEAL_CARDS` may carry.
pub const MAX_DEALT_CARDS: u32 = 20;
/// Upper bound for a reported hand value.
pub const MAX_HAND_VALUE: u32 = 100;
/// Upper bound for a game score.
pub const MAX_SCORE: u32 = 100;
/// Valid round numbers.
pub const ROUND_RANGE: std::ops::RangeInclusive<u32> = 1..=1000;

// ---------------------------------------------------------------------------
// Enumerated tokens
// ---------------------------------------------------------------------------

/// The local player's role in the current game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Banker,
    Player,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Banker => "BANKER",
            Role::Player => "PLAYER",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "BANKER" => Ok(Role::Banker),
            "PLAYER" => Ok(Role::Player),
            _ => Err(()),
        }
    }
}

/// What the opponent just did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpponentAction {
    /// Drew a card (one more face-down card on their side).
    Hit,
    Stand,
    Busted,
    PlayedCard,
}

impl std::str::FromStr for OpponentAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "HIT" => Ok(OpponentAction::Hit),
            "STAND" => Ok(OpponentAction::Stand),
            "BUSTED" => Ok(OpponentAction::Busted),
            "PLAYED_CARD" => Ok(OpponentAction::PlayedCard),
            _ => Err(()),
        }
    }
}

/// Outcome of a round or a game, from the local player's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    You,
    Opponent,
    Tie,
}

impl std::str::FromStr for Winner {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "YOU" => Ok(Winner::You),
            "OPPONENT" => Ok(Winner::Opponent),
            "TIE" => Ok(Winner::Tie),
            _ => Err(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

/// Borrowed reader over a message's parameters that produces
/// [`ProtocolError::InvalidData`] errors tagged with the command.
struct Params<'a> {
    msg: &'a Message,
}

impl<'a> Params<'a> {
    fn new(msg: &'a Message) -> Self {
        Self { msg }
    }

    fn error(&self, reason: impl Into<String>) -> ProtocolError {
        ProtocolError::invalid(self.msg.command.clone(), reason)
    }

    fn require(&self, count: usize) -> Result<(), ProtocolError> {
        if self.msg.params.len() < count {
            return Err(self.error(format!(
                "expected at least {count} parameters, got {}",
                self.msg.params.len()
            )));
        }
        Ok(())
    }

    fn str(&self, index: usize, name: &str) -> Result<&'a str, ProtocolError> {
        self.msg
            .params
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.error(format!("missing {name}")))
    }

    fn number(
        &self,
        index: usize,
        name: &str,
        range: std::ops::RangeInclusive<u32>,
    ) -> Result<u32, ProtocolError> {
        let raw = self.str(index, name)?;
        let value: u32 = raw
            .trim()
            .parse()
            .map_err(|_| self.error(format!("{name} is not a number: {raw:?}")))?;
        if !range.contains(&value) {
            return Err(self.error(format!("{name} out of range: {value}")));
        }
        Ok(value)
    }

    fn token<T: std::str::FromStr>(&self, index: usize, name: &str) -> Result<T, ProtocolError> {
        let raw = self.str(index, name)?;
        raw.parse()
            .map_err(|_| self.error(format!("unknown {name}: {raw:?}")))
    }

    fn card(&self, index: usize) -> Result<Card, ProtocolError> {
        let raw = self.str(index, "card")?;
        raw.parse()
            .map_err(|_| self.error(format!("invalid card: {raw:?}")))
    }
}

fn expect_command(msg: &Message, expected: &str) -> Result<(), ProtocolError> {
    if msg.command != expected {
        return Err(ProtocolError::invalid(
            msg.command.clone(),
            format!("expected {expected}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Asynchronous game events
// ---------------------------------------------------------------------------

/// A validated asynchronous game event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// The local player may now hit or stand.
    YourTurn,
    OpponentAction {
        action: OpponentAction,
        /// Free-form detail (e.g. the played card). Empty if absent.
        data: String,
    },
    RoundEnd {
        winner: Winner,
        your_total: u32,
        opponent_total: u32,
        /// The opponent's hand, when the server reveals it.
        opponent_cards: Option<Vec<Card>>,
    },
    GameEnd {
        winner: Winner,
        your_score: u32,
        opponent_score: u32,
    },
    PlayerDisconnected {
        nickname: String,
    },
    PlayerReconnected {
        nickname: String,
    },
    /// A fresh deal: replaces the local hand. The opponent gets the same
    /// number of face-down cards.
    DealCards {
        cards: Vec<Card>,
    },
    GameState {
        round: u32,
        your_score: u32,
        opponent_score: u32,
        role: Role,
    },
    /// One more card for the local hand.
    Card(Card),
}

impl GameEvent {
    /// Validates an async message and converts it into an event.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidData`] for unknown commands, missing
    /// parameters, or out-of-range values.
    pub fn parse(msg: &Message) -> Result<Self, ProtocolError> {
        let p = Params::new(msg);
        let event = match msg.command.as_str() {
            command::YOUR_TURN => GameEvent::YourTurn,
            command::OPPONENT_ACTION => GameEvent::OpponentAction {
                action: p.token(0, "opponent action")?,
                data: msg.param(1).unwrap_or_default().to_string(),
            },
            command::ROUND_END => {
                p.require(3)?;
                let opponent_cards = match msg.param(4) {
                    Some(csv) if !csv.is_empty() => Some(
                        parse_card_list(csv)
                            .map_err(|_| p.error(format!("invalid opponent cards: {csv:?}")))?,
                    ),
                    _ => None,
                };
                GameEvent::RoundEnd {
                    winner: p.token(0, "winner")?,
                    your_total: p.number(1, "hand value", 0..=MAX_HAND_VALUE)?,
                    opponent_total: p.number(2, "hand value", 0..=MAX_HAND_VALUE)?,
                    opponent_cards,
                }
            }
            command::GAME_END => {
                p.require(3)?;
                GameEvent::GameEnd {
                    winner: p.token(0, "winner")?,
                    your_score: p.number(1, "score", 0..=MAX_SCORE)?,
                    opponent_score: p.number(2, "score", 0..=MAX_SCORE)?,
                }
            }
            command::PLAYER_DISCONNECTED => GameEvent::PlayerDisconnected {
                nickname: msg.param(0).unwrap_or_default().to_string(),
            },
            command::PLAYER_RECONNECTED => GameEvent::PlayerReconnected {
                nickname: msg.param(0).unwrap_or_default().to_string(),
            },
            command::DEAL_CARDS => {
                let count = p.number(0, "card count", 0..=MAX_DEALT_CARDS)?;
                // `count` is at most 20, so the cast cannot truncate.
                let count = count as usize;
                p.require(count + 1)?;
                let cards = (1..=count)
                    .map(|i| p.card(i))
                    .collect::<Result<Vec<_>, _>>()?;
                GameEvent::DealCards { cards }
            }
            command::GAME_STATE => {
                p.require(4)?;
                GameEvent::GameState {
                    round: p.number(0, "round", ROUND_RANGE)?,
                    your_score: p.number(1, "score", 0..=MAX_SCORE)?,
                    opponent_score: p.number(2, "score", 0..=MAX_SCORE)?,
                    role: p.token(3, "role")?,
                }
            }
            command::CARD => GameEvent::Card(p.card(0)?),
            other => return Err(p.error(format!("{other} is not a game event"))),
        };
        Ok(event)
    }

    /// The wire command this event came from.
    pub fn command(&self) -> &'static str {
        match self {
            GameEvent::YourTurn => command::YOUR_TURN,
            GameEvent::OpponentAction { .. } => command::OPPONENT_ACTION,
            GameEvent::RoundEnd { .. } => command::ROUND_END,
            GameEvent::GameEnd { .. } => command::GAME_END,
            GameEvent::PlayerDisconnected { .. } => command::PLAYER_DISCONNECTED,
            GameEvent::PlayerReconnected { .. } => command::PLAYER_RECONNECTED,
            GameEvent::DealCards { .. } => command::DEAL_CARDS,
            GameEvent::GameState { .. } => command::GAME_STATE,
            GameEvent::Card(_) => command::CARD,
        }
    }
}

// ---------------------------------------------------------------------------
// Synchronous payloads
// ---------------------------------------------------------------------------

/// `GAME_START|role|opponentNick`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStart {
    pub role: Role,
    pub opponent: String,
}

impl GameStart {
    pub fn parse(msg: &Message) -> Result<Self, ProtocolError> {
        expect_command(msg, command::GAME_START)?;
        let p = Params::new(msg);
        p.require(2)?;
        let opponent = p.str(1, "opponent nickname")?;
        if opponent.is_empty() {
            return Err(p.error("empty opponent nickname"));
        }
        Ok(Self {
            role: p.token(0, "role")?,
            opponent: opponent.to_string(),
        })
    }
}

/// `RECONNECT_QUERY|roomId|opponentNick`: the server offers to put the
/// player back into an interrupted game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectOffer {
    pub room_id: u32,
    pub opponent: String,
}

impl ReconnectOffer {
    pub fn parse(msg: &Message) -> Result<Self, ProtocolError> {
        expect_command(msg, command::RECONNECT_QUERY)?;
        let p = Params::new(msg);
        p.require(2)?;
        Ok(Self {
            room_id: p.number(0, "room id", crate::room::ROOM_ID_RANGE)?,
            opponent: p.str(1, "opponent nickname")?.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<GameEvent, ProtocolError> {
        GameEvent::parse(&Message::decode(line).unwrap())
    }

    fn card(s: &str) -> Card {
        s.parse().unwrap()
    }

    // =====================================================================
    // GameEvent::parse()
    // =====================================================================

    #[test]
    fn test_parse_deal_cards_valid() {
        let event = parse("DEAL_CARDS|2|SRDCE-ESO|KULE-SEDM").unwrap();
        assert_eq!(
            event,
            GameEvent::DealCards {
                cards: vec![card("SRDCE-ESO"), card("KULE-SEDM")]
            }
        );
    }

    #[test]
    fn test_parse_deal_cards_count_out_of_range_rejected() {
        assert!(parse("DEAL_CARDS|21").is_err());
        assert!(parse("DEAL_CARDS|-1").is_err());
        assert!(parse("DEAL_CARDS|two|SRDCE-ESO|KULE-SEDM").is_err());
    }

    #[test]
    fn test_parse_deal_cards_missing_cards_rejected() {
        let err = parse("DEAL_CARDS|3|SRDCE-ESO|KULE-SEDM").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidData { ref command, .. } if command == "DEAL_CARDS"));
    }

    #[test]
    fn test_parse_deal_cards_invalid_card_rejected() {
        assert!(parse("DEAL_CARDS|2|SRDCE-ESO|KULE-JOKER").is_err());
    }

    #[test]
    fn test_parse_deal_cards_zero_is_empty_hand() {
        assert_eq!(parse("DEAL_CARDS|0").unwrap(), GameEvent::DealCards { cards: vec![] });
    }

    #[test]
    fn test_parse_game_state_valid() {
        let event = parse("GAME_STATE|3|1|2|BANKER").unwrap();
        assert_eq!(
            event,
            GameEvent::GameState {
                round: 3,
                your_score: 1,
                opponent_score: 2,
                role: Role::Banker
            }
        );
    }

    #[test]
    fn test_parse_game_state_rejects_bad_values() {
        assert!(parse("GAME_STATE|0|1|2|BANKER").is_err(), "round 0");
        assert!(parse("GAME_STATE|1001|1|2|BANKER").is_err(), "round 1001");
        assert!(parse("GAME_STATE|1|101|2|BANKER").is_err(), "score 101");
        assert!(parse("GAME_STATE|1|1|2|DEALER").is_err(), "unknown role");
        assert!(parse("GAME_STATE|1|1|2").is_err(), "missing role");
    }

    #[test]
    fn test_parse_round_end_without_reveal() {
        let event = parse("ROUND_END|YOU|20|18").unwrap();
        assert_eq!(
            event,
            GameEvent::RoundEnd {
                winner: Winner::You,
                your_total: 20,
                opponent_total: 18,
                opponent_cards: None
            }
        );
    }

    #[test]
    fn test_parse_round_end_reveals_opponent_cards() {
        let event = parse("ROUND_END|OPPONENT|15|21|x|SRDCE-ESO,KULE-ESO").unwrap();
        let GameEvent::RoundEnd { opponent_cards, .. } = event else {
            panic!("expected RoundEnd");
        };
        assert_eq!(opponent_cards, Some(vec![card("SRDCE-ESO"), card("KULE-ESO")]));
    }

    #[test]
    fn test_parse_round_end_empty_reveal_is_none() {
        let GameEvent::RoundEnd { opponent_cards, .. } = parse("ROUND_END|TIE|17|17||").unwrap() else {
            panic!("expected RoundEnd");
        };
        assert_eq!(opponent_cards, None);
    }

    #[test]
    fn test_parse_round_end_rejects_bad_values() {
        assert!(parse("ROUND_END|NOBODY|20|18").is_err());
        assert!(parse("ROUND_END|YOU|101|18").is_err());
        assert!(parse("ROUND_END|YOU|20").is_err());
        assert!(parse("ROUND_END|YOU|20|18|x|SRDCE-ESO,BAD").is_err());
    }

    #[test]
    fn test_parse_game_end_valid() {
        assert_eq!(
            parse("GAME_END|TIE|3|3").unwrap(),
            GameEvent::GameEnd {
                winner: Winner::Tie,
                your_score: 3,
                opponent_score: 3
            }
        );
    }

    #[test]
    fn test_parse_opponent_action_tokens() {
        assert_eq!(
            parse("OPPONENT_ACTION|PLAYED_CARD|LISTY-KRAL").unwrap(),
            GameEvent::OpponentAction {
                action: OpponentAction::PlayedCard,
                data: "LISTY-KRAL".into()
            }
        );
        assert_eq!(
            parse("OPPONENT_ACTION|HIT").unwrap(),
            GameEvent::OpponentAction {
                action: OpponentAction::Hit,
                data: String::new()
            }
        );
        assert!(parse("OPPONENT_ACTION|DANCE").is_err());
        assert!(parse("OPPONENT_ACTION").is_err());
    }

    #[test]
    fn test_parse_card_and_your_turn() {
        assert_eq!(parse("CARD|LISTY-OSM").unwrap(), GameEvent::Card(card("LISTY-OSM")));
        assert!(parse("CARD|LISTY").is_err());
        assert!(parse("CARD").is_err());
        assert_eq!(parse("YOUR_TURN").unwrap(), GameEvent::YourTurn);
    }

    #[test]
    fn test_parse_player_presence_events() {
        assert_eq!(
            parse("PLAYER_DISCONNECTED|bob").unwrap(),
            GameEvent::PlayerDisconnected { nickname: "bob".into() }
        );
        assert_eq!(
            parse("PLAYER_RECONNECTED|bob").unwrap(),
            GameEvent::PlayerReconnected { nickname: "bob".into() }
        );
    }

    #[test]
    fn test_parse_non_event_rejected() {
        assert!(parse("OK").is_err());
        assert!(parse("GAME_START|BANKER|bob").is_err());
    }

    #[test]
    fn test_command_matches_source() {
        for line in ["YOUR_TURN", "CARD|KULE-ESO", "GAME_END|YOU|5|2", "DEAL_CARDS|0"] {
            let msg = Message::decode(line).unwrap();
            assert_eq!(GameEvent::parse(&msg).unwrap().command(), msg.command);
        }
    }

    // =====================================================================
    // Sync payloads
    // =====================================================================

    #[test]
    fn test_game_start_parse() {
        let msg = Message::decode("GAME_START|PLAYER|bob").unwrap();
        assert_eq!(
            GameStart::parse(&msg).unwrap(),
            GameStart {
                role: Role::Player,
                opponent: "bob".into()
            }
        );
        assert!(GameStart::parse(&Message::decode("GAME_START|KING|bob").unwrap()).is_err());
        assert!(GameStart::parse(&Message::decode("GAME_START|PLAYER|").unwrap()).is_err());
        assert!(GameStart::parse(&Message::decode("GAME_START|PLAYER").unwrap()).is_err());
    }

    #[test]
    fn test_reconnect_offer_parse() {
        let msg = Message::decode("RECONNECT_QUERY|42|bob").unwrap();
        assert_eq!(
            ReconnectOffer::parse(&msg).unwrap(),
            ReconnectOffer {
                room_id: 42,
                opponent: "bob".into()
            }
        );
        assert!(ReconnectOffer::parse(&Message::decode("RECONNECT_QUERY|0|bob").unwrap()).is_err());
        assert!(ReconnectOffer::parse(&Message::decode("OK|42|bob").unwrap()).is_err());
    }
}
