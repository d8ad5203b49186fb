//! Notifications for the presentation layer.

use okobere_protocol::{GameEvent, GameStart, ReconnectOffer};
use okobere_session::ClientState;

/// Everything the client reports without being asked.
///
/// Delivered in order on the channel returned by
/// [`GameClient::new`](crate::GameClient::new). The client never blocks on
/// the receiver; dropping it just discards notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The server offers to resume an interrupted game. Answer with
    /// `accept_reconnect` or `decline_reconnect`.
    ReconnectOffered(ReconnectOffer),
    /// `GAME_START` arrived; the session is now `PLAYING`.
    GameStarted(GameStart),
    /// A validated async game event, already applied to the session.
    Game(GameEvent),
    /// The round result pause is over.
    RoundResultHidden,
    /// The game-over pause is over and the session is back in the lobby.
    ReturnedToLobby,
    /// An async event failed validation. It was not applied or acknowledged.
    InvalidServerData(String),
    /// The game-start watcher got `ERROR|text`.
    ServerError(String),

    /// The connection died (server closed it, read failure, or silence).
    ConnectionLost,
    /// About to wait `attempt`'s backoff delay and try again.
    Reconnecting { attempt: u32, max_attempts: u32 },
    /// A resumption login succeeded and `state` was restored.
    Reconnected { state: ClientState },
    /// The server no longer knows about the room the client was in.
    ServerRestarted,
    /// Every attempt failed. `retry_reconnect` starts another round.
    ReconnectFailed,
    /// `disconnect()` finished.
    Disconnected,
}
