//! Wire protocol for the Oko Bere client.
//!
//! This crate defines the "language" the client and the game server speak:
//!
//! - **Framing** ([`Message`]) — one `COMMAND|param|param` text line,
//!   with size and arity caps enforced on decode.
//! - **Commands** ([`command`] constants, [`MessageKind`]) — the fixed
//!   vocabulary and the sync/async classification the router relies on.
//! - **Cards** ([`Card`], [`hand_value`]) — card identifiers and scoring.
//! - **Events** ([`GameEvent`], [`GameStart`], [`ReconnectOffer`]) —
//!   validated, typed views of server messages.
//! - **Rooms** ([`RoomInfo`]) — entries of a room listing.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw text lines) and the
//! session (client state). It knows nothing about sockets or timing.
//!
//! ```text
//! Transport (lines) → Protocol (Message / GameEvent) → Session (state)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod card;
pub mod command;
mod error;
mod event;
mod message;
mod room;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use card::{Card, Rank, Suit, calculate_hand_value, hand_value, parse_card_list};
pub use command::MessageKind;
pub use error::ProtocolError;
pub use event::{GameEvent, GameStart, OpponentAction, ReconnectOffer, Role, Winner};
pub use message::{MAX_MESSAGE_SIZE, MAX_PARAMETERS, Message};
pub use room::{MAX_ROOM_COUNT, ROOM_ID_RANGE, RoomInfo, RoomStatus, parse_room_count};
