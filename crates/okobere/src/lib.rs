//! # Oko Bere client
//!
//! The client-side engine for Oko Bere, a two-player card game played over
//! a line-based TCP protocol. This meta-crate ties the layers together
//! into one [`GameClient`]:
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | `okobere-protocol` | Message framing, commands, cards, validated events |
//! | `okobere-transport` | One TCP connection, newline framing, read timeouts |
//! | `okobere-heartbeat` | `PING` timer and silence detection |
//! | `okobere-session` | Client state machine and game view |
//! | `okobere` (this crate) | Routing, request/reply, reconnection |
//!
//! # How a message flows
//!
//! ```text
//!                      ┌─→ sync queue ──→ request waiters, game-start watcher
//!   TCP ──→ router ────┤
//!            (PONG     └─→ async queue ─→ processor ─→ Session ─→ ClientEvent
//!             dropped)                        └─→ ACK_* back to the server
//! ```
//!
//! The router is the only reader of a live session's connection. Requests
//! send a command and wait on the sync queue for their reply; async game
//! events are applied in arrival order by the processor. When the
//! connection dies, the reconnect coordinator logs back in with the stored
//! session token and works out which state to restore.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use okobere::{ClientConfig, ClientEvent, GameClient, LoginOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), okobere::ClientError> {
//!     let (client, mut events) = GameClient::new(ClientConfig::default());
//!     client.connect("127.0.0.1", 10000).await?;
//!
//!     if let LoginOutcome::ReconnectOffered(_) = client.login("alice", None).await? {
//!         client.decline_reconnect().await?;
//!     }
//!     let room = client.create_room("Kuchyne").await?;
//!     println!("waiting for an opponent in room {room}");
//!
//!     while let Some(event) = events.recv().await {
//!         if let ClientEvent::Game(okobere::protocol::GameEvent::YourTurn) = event {
//!             client.stand().await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod event;
mod handshake;
mod processor;
mod queue;
mod reconnect;
mod router;
mod shared;
mod watcher;

pub use client::{GameClient, LoginOutcome};
pub use config::ClientConfig;
pub use error::ClientError;
pub use event::ClientEvent;
pub use queue::{MessageQueue, ReplyClaim};
pub use reconnect::ReconnectPolicy;

/// Re-export sub-crates for direct access.
pub use okobere_heartbeat as heartbeat;
pub use okobere_protocol as protocol;
pub use okobere_session as session;
pub use okobere_transport as transport;

pub use okobere_session::{ClientState, SessionSnapshot};
