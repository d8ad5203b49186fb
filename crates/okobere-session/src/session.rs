//! The session record and its transitions.
//!
//! Every method here corresponds to something the client has *confirmed*:
//! a reply the server sent, an event that passed validation, or a local
//! decision (disconnect, reconnect). Nothing in this module talks to the
//! network, which keeps the whole state machine testable synchronously.

use okobere_protocol::{Card, GameEvent, GameStart, OpponentAction, ReconnectOffer, Role, hand_value};
use serde::{Deserialize, Serialize};

use crate::{ClientState, OpponentHand, SessionError};

/// Returns `true` if a login error means the stored session token is
/// useless (invalid or expired) and must be dropped.
///
/// The server words these as "Invalid session ID" and "Session expired".
pub fn is_session_rejection(error_text: &str) -> bool {
    error_text.to_ascii_lowercase().contains("session")
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Everything the client knows about its session with the server.
#[derive(Debug, Clone, Default)]
pub struct Session {
    nickname: Option<String>,
    /// Opaque, server-issued. Presented on login to resume a session.
    token: Option<String>,
    state: ClientState,
    room_id: Option<u32>,
    role: Option<Role>,
    opponent: Option<String>,
    round: u32,
    your_score: u32,
    opponent_score: u32,
    hand: Vec<Card>,
    opponent_hand: OpponentHand,
    /// Totals announced by the last `ROUND_END`.
    last_round_totals: Option<(u32, u32)>,
    /// Set while a `RECONNECT_QUERY` awaits an answer.
    reconnect_offer: Option<ReconnectOffer>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Accessors ---------------------------------------------------------

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn room_id(&self) -> Option<u32> {
        self.room_id
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn opponent(&self) -> Option<&str> {
        self.opponent.as_deref()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// `(yours, opponent's)`.
    pub fn scores(&self) -> (u32, u32) {
        (self.your_score, self.opponent_score)
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn opponent_hand(&self) -> &OpponentHand {
        &self.opponent_hand
    }

    pub fn reconnect_offer(&self) -> Option<&ReconnectOffer> {
        self.reconnect_offer.as_ref()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_offer.is_some()
    }

    /// Fails with [`SessionError::InvalidState`] unless the session is in
    /// one of `allowed`.
    pub fn require(
        &self,
        operation: &'static str,
        allowed: &[ClientState],
    ) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    // -- Connection lifecycle ----------------------------------------------

    /// The transport is up: `DISCONNECTED → CONNECTED`.
    pub fn on_connected(&mut self) -> Result<(), SessionError> {
        self.require("connect", &[ClientState::Disconnected])?;
        self.transition(ClientState::Connected);
        Ok(())
    }

    /// A plain `OK|token` login reply: store identity, enter the lobby.
    pub fn on_login_accepted(&mut self, nickname: &str, token: &str) -> Result<(), SessionError> {
        self.require("log in", &[ClientState::Connected])?;
        self.nickname = Some(nickname.to_string());
        self.token = Some(token.to_string());
        self.reconnect_offer = None;
        self.transition(ClientState::Lobby);
        Ok(())
    }

    /// The server answered the login with `RECONNECT_QUERY`. The state
    /// stays `CONNECTED` until the offer is accepted or declined.
    pub fn on_reconnect_offered(
        &mut self,
        nickname: &str,
        offer: ReconnectOffer,
    ) -> Result<(), SessionError> {
        self.require("log in", &[ClientState::Connected])?;
        tracing::info!(
            room_id = offer.room_id,
            opponent = %offer.opponent,
            "server offers to resume an interrupted game"
        );
        self.nickname = Some(nickname.to_string());
        self.reconnect_offer = Some(offer);
        Ok(())
    }

    /// The login was refused. The state doesn't change; a refusal that
    /// names the session invalidates the stored token.
    ///
    /// Returns `true` if the token was cleared.
    pub fn on_login_rejected(&mut self, error_text: &str) -> bool {
        if self.token.is_some() && is_session_rejection(error_text) {
            tracing::info!(reason = error_text, "stored session token rejected, clearing");
            self.token = None;
            return true;
        }
        false
    }

    /// `RECONNECT_ACCEPT` was confirmed: back into the offered game.
    pub fn on_reconnect_accepted(&mut self, token: &str) -> Result<(), SessionError> {
        self.require("accept reconnect", &[ClientState::Connected])?;
        let offer = self
            .reconnect_offer
            .take()
            .ok_or(SessionError::NoPendingReconnect)?;
        self.token = Some(token.to_string());
        self.room_id = Some(offer.room_id);
        self.opponent = Some(offer.opponent);
        self.transition(ClientState::Playing);
        Ok(())
    }

    /// `RECONNECT_DECLINE` was confirmed: the interrupted game is abandoned.
    pub fn on_reconnect_declined(&mut self, token: &str) -> Result<(), SessionError> {
        self.require("decline reconnect", &[ClientState::Connected])?;
        self.reconnect_offer
            .take()
            .ok_or(SessionError::NoPendingReconnect)?;
        self.token = Some(token.to_string());
        self.reset_game_state();
        self.room_id = None;
        self.transition(ClientState::Lobby);
        Ok(())
    }

    /// The server refused the answer to a reconnect offer. The offer is
    /// gone; the state is unchanged.
    pub fn on_reconnect_answer_failed(&mut self) {
        self.reconnect_offer = None;
    }

    /// Starts a reconnect attempt: the game view is kept so it can be
    /// resumed, but the session falls back to `CONNECTED` for the new
    /// login. Returns the state the session was in.
    pub fn begin_resume(&mut self) -> ClientState {
        let prior = self.state;
        self.reconnect_offer = None;
        self.transition(ClientState::Connected);
        prior
    }

    /// Restores a state after a successful resumption login (which moved
    /// the session to `LOBBY`).
    pub fn resume_as(&mut self, state: ClientState) {
        self.transition(state);
    }

    /// The connection is gone for good (user-initiated). Identity and token
    /// survive so a later login can resume.
    pub fn on_disconnected(&mut self) {
        self.reset_game_state();
        self.room_id = None;
        self.reconnect_offer = None;
        self.transition(ClientState::Disconnected);
    }

    // -- Rooms ---------------------------------------------------------------

    /// `ROOM_CREATED|id` or `JOINED` was received: `LOBBY → IN_ROOM`.
    pub fn on_room_entered(&mut self, room_id: u32) -> Result<(), SessionError> {
        self.require("enter a room", &[ClientState::Lobby])?;
        self.reset_game_state();
        self.room_id = Some(room_id);
        self.transition(ClientState::InRoom);
        Ok(())
    }

    /// `GAME_START|role|opponent`: `IN_ROOM → PLAYING`.
    ///
    /// Also accepted while already `PLAYING`, which happens when a resumed
    /// game restarts.
    pub fn on_game_start(&mut self, start: GameStart) -> Result<(), SessionError> {
        self.require("start a game", &[ClientState::InRoom, ClientState::Playing])?;
        self.role = Some(start.role);
        self.opponent = Some(start.opponent);
        self.transition(ClientState::Playing);
        Ok(())
    }

    /// Left the room (confirmed or not): back to the lobby.
    pub fn on_left_room(&mut self) {
        self.reset_to_lobby();
    }

    // -- Game events ---------------------------------------------------------

    /// Applies a validated async event.
    ///
    /// Events only refine the game view; the one state change is
    /// `PLAYER_DISCONNECTED`, which drops back to `IN_ROOM` to wait for the
    /// opponent.
    pub fn apply(&mut self, event: &GameEvent) {
        match event {
            GameEvent::YourTurn | GameEvent::PlayerReconnected { .. } => {}
            GameEvent::OpponentAction { action, .. } => {
                if *action == OpponentAction::Hit {
                    let count = self.opponent_hand.card_count().saturating_add(1);
                    self.opponent_hand = OpponentHand::Hidden(count);
                }
            }
            GameEvent::RoundEnd {
                your_total,
                opponent_total,
                opponent_cards,
                ..
            } => {
                self.last_round_totals = Some((*your_total, *opponent_total));
                if let Some(cards) = opponent_cards {
                    self.opponent_hand = OpponentHand::Revealed(cards.clone());
                }
            }
            GameEvent::GameEnd {
                your_score,
                opponent_score,
                ..
            } => {
                self.your_score = *your_score;
                self.opponent_score = *opponent_score;
            }
            GameEvent::PlayerDisconnected { .. } => {
                if self.state.in_room_or_game() {
                    self.reset_game_state();
                    self.transition(ClientState::InRoom);
                }
            }
            GameEvent::DealCards { cards } => {
                self.hand = cards.clone();
                self.opponent_hand =
                    OpponentHand::Hidden(u32::try_from(cards.len()).unwrap_or(u32::MAX));
                self.last_round_totals = None;
            }
            GameEvent::GameState {
                round,
                your_score,
                opponent_score,
                role,
            } => {
                self.round = *round;
                self.your_score = *your_score;
                self.opponent_score = *opponent_score;
                self.role = Some(*role);
            }
            GameEvent::Card(card) => self.hand.push(*card),
        }
    }

    // -- Resets --------------------------------------------------------------

    /// Clears everything about the current game (hands, scores, round,
    /// role, opponent). Room and identity are kept.
    pub fn reset_game_state(&mut self) {
        self.role = None;
        self.opponent = None;
        self.round = 0;
        self.your_score = 0;
        self.opponent_score = 0;
        self.hand.clear();
        self.opponent_hand = OpponentHand::default();
        self.last_round_totals = None;
    }

    /// Game over or room gone: reset the game and return to `LOBBY`.
    pub fn reset_to_lobby(&mut self) {
        self.reset_game_state();
        self.room_id = None;
        self.transition(ClientState::Lobby);
    }

    // -- Snapshot ------------------------------------------------------------

    /// A read-only copy for presentation.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            nickname: self.nickname.clone(),
            has_token: self.token.is_some(),
            room_id: self.room_id,
            role: self.role,
            opponent: self.opponent.clone(),
            round: self.round,
            your_score: self.your_score,
            opponent_score: self.opponent_score,
            hand: self.hand.clone(),
            hand_value: hand_value(&self.hand),
            opponent_hand: self.opponent_hand.clone(),
            last_round_totals: self.last_round_totals,
            reconnect_offer: self.reconnect_offer.clone(),
        }
    }

    fn transition(&mut self, next: ClientState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "session state changed");
            self.state = next;
        }
    }
}

/// Read-only view of a [`Session`], safe to hand to the presentation layer.
///
/// The token itself is not exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: ClientState,
    pub nickname: Option<String>,
    pub has_token: bool,
    pub room_id: Option<u32>,
    pub role: Option<Role>,
    pub opponent: Option<String>,
    pub round: u32,
    pub your_score: u32,
    pub opponent_score: u32,
    pub hand: Vec<Card>,
    pub hand_value: u32,
    pub opponent_hand: OpponentHand,
    pub last_round_totals: Option<(u32, u32)>,
    pub reconnect_offer: Option<ReconnectOffer>,
}

// =========================================================================
// Tests
// =========================================================================
