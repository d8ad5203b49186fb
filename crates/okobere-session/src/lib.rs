//! Client session state for Oko Bere.
//!
//! This crate holds everything the client knows about its relationship
//! with the server:
//!
//! 1. **Identity** — nickname and the server-issued session token used to
//!    resume after a dropped connection
//! 2. **Lifecycle** — the [`ClientState`] machine
//!    (`DISCONNECTED → CONNECTED → LOBBY → IN_ROOM → PLAYING`)
//! 3. **Game view** — room, role, scores, and both hands
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← applies confirmed replies and events, serializes access
//!     ↕
//! Session Layer (this crate)  ← pure state, no I/O, no locking
//!     ↕
//! Protocol Layer (below)  ← provides Card, Role, GameEvent
//! ```
//!
//! [`Session`] is deliberately plain data with methods: it is owned by the
//! client behind one async mutex, and every mutation goes through it.

mod error;
mod session;
mod state;

pub use error::SessionError;
pub use session::{Session, SessionSnapshot, is_session_rejection};
pub use state::{ClientState, OpponentHand};
