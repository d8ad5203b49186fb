//! The public client facade.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use okobere_protocol::{
    Message, ROOM_ID_RANGE, ReconnectOffer, RoomInfo, command, parse_room_count,
};
use okobere_session::{ClientState, SessionSnapshot};
use okobere_transport::LineConnection;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::event::ClientEvent;
use crate::handshake::{self, LoginReply};
use crate::reconnect;
use crate::shared::Shared;
use crate::{processor, router, watcher};

/// What a successful `login` led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Logged in. Usually `LOBBY`, but the server may put a returning
    /// player straight back into a room or a running game.
    LoggedIn(ClientState),
    /// The server offers to resume an interrupted game; answer with
    /// [`GameClient::accept_reconnect`] or [`GameClient::decline_reconnect`].
    ReconnectOffered(ReconnectOffer),
}

/// A connection to an Oko Bere server and everything built on it.
///
/// Operations are request/reply: each sends one command and waits for the
/// matching reply. Everything the server sends on its own (game events,
/// connection trouble) arrives on the event channel returned by
/// [`GameClient::new`].
///
/// Dropping the client stops all of its background tasks.
pub struct GameClient {
    shared: Arc<Shared>,
}

impl GameClient {
    pub fn new(config: ClientConfig) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new(config, events));
        (Self { shared }, rx)
    }

    // -- Connection ------------------------------------------------------------

    /// Opens the TCP connection: `DISCONNECTED → CONNECTED`.
    pub async fn connect(&self, host: &str, port: u16) -> Result<(), ClientError> {
        self.shared
            .session
            .lock()
            .await
            .require("connect", &[ClientState::Disconnected])?;

        let conn = LineConnection::connect(host, port, self.shared.config.connection()).await?;
        info!(conn = %conn.id(), addr = conn.addr(), "connected");

        self.shared.manual_disconnect.store(false, Ordering::SeqCst);
        self.shared.set_endpoint(host, port);
        self.shared.sync_queue.clear();
        self.shared.async_queue.clear();
        self.shared.session.lock().await.on_connected()?;
        self.shared.install_connection(Arc::new(conn)).await;
        Ok(())
    }

    /// Logs in as `nickname`, presenting `token` to resume an earlier
    /// session.
    ///
    /// # Errors
    /// - [`ClientError::Server`] if the login is refused; a refusal that
    ///   names the session also clears the stored token
    /// - [`ClientError::InvalidInput`] for an empty nickname or one
    ///   containing `|`
    /// - [`ClientError::NotConnected`] if `disconnect` ran before the
    ///   session was established
    pub async fn login(
        &self,
        nickname: &str,
        token: Option<&str>,
    ) -> Result<LoginOutcome, ClientError> {
        validate_field("nickname", nickname)?;
        self.shared
            .session
            .lock()
            .await
            .require("log in", &[ClientState::Connected])?;

        let conn = self.shared.connection().await?;
        match handshake::login(&self.shared, &conn, nickname, token).await? {
            LoginReply::Accepted => {
                let state = reconnect::establish(&self.shared, conn, ClientState::Connected)
                    .await
                    .ok_or(ClientError::NotConnected)?;
                reconnect::start_processing(&self.shared, state);
                Ok(LoginOutcome::LoggedIn(state))
            }
            LoginReply::Offered(offer) => Ok(LoginOutcome::ReconnectOffered(offer)),
        }
    }

    /// Accepts a pending reconnect offer: back into the interrupted game.
    pub async fn accept_reconnect(&self) -> Result<(), ClientError> {
        let reply = self.answer_offer(Message::reconnect_accept()).await?;
        let conn = self.shared.connection().await?;
        {
            let mut session = self.shared.session.lock().await;
            let token = fresh_token(&reply, session.token())?;
            session.on_reconnect_accepted(&token)?;
        }
        info!("resumed interrupted game");
        self.start_session(conn);
        // The server restarts the game with a GAME_START.
        watcher::restart(&self.shared);
        Ok(())
    }

    /// Declines a pending reconnect offer and goes to the lobby.
    pub async fn decline_reconnect(&self) -> Result<(), ClientError> {
        let reply = self.answer_offer(Message::reconnect_decline()).await?;
        let conn = self.shared.connection().await?;
        {
            let mut session = self.shared.session.lock().await;
            let token = fresh_token(&reply, session.token())?;
            session.on_reconnect_declined(&token)?;
        }
        info!("declined interrupted game");
        self.start_session(conn);
        Ok(())
    }

    /// Tears the connection down and stops reconnecting. Never fails.
    pub async fn disconnect(&self) {
        self.shared.manual_disconnect.store(true, Ordering::SeqCst);
        self.shared.stop_all_tasks();
        self.shared.reconnecting.store(false, Ordering::SeqCst);

        if let Some(conn) = self.shared.take_connection().await {
            if let Err(e) = conn.send(&Message::disconnect().encode()).await {
                debug!(error = %e, "DISCONNECT not delivered");
            }
            conn.close().await;
        }
        self.shared.sync_queue.clear();
        self.shared.async_queue.clear();
        self.shared.clear_resume_target();
        self.shared.session.lock().await.on_disconnected();
        info!("disconnected");
        self.shared.emit(ClientEvent::Disconnected);
    }

    /// Starts a new round of reconnect attempts with the stored nickname
    /// and token.
    pub fn retry_reconnect(&self) -> Result<(), ClientError> {
        reconnect::retry(&self.shared)
    }

    pub fn is_reconnecting(&self) -> bool {
        self.shared.reconnecting.load(Ordering::SeqCst)
    }

    // -- Lobby -------------------------------------------------------------------

    /// Lists the server's rooms, sorted by id. Entries that fail
    /// validation are skipped.
    pub async fn list_rooms(&self) -> Result<Vec<RoomInfo>, ClientError> {
        self.require("list rooms", &[ClientState::Lobby]).await?;
        let timeout = self.shared.config.request_timeout();
        // Held across the entries so a stray ERROR fails the listing.
        let _claim = self.shared.sync_queue.claim();
        let header = self
            .request(Message::room_list(), command::ROOMS, timeout)
            .await?;
        let count = parse_room_count(&header)?;

        let mut rooms = Vec::new();
        for _ in 0..count {
            let entry = self.await_reply(command::ROOM, timeout).await?;
            match RoomInfo::parse(&entry) {
                Ok(info) => rooms.push(info),
                Err(e) => warn!(error = %e, "skipping invalid room entry"),
            }
        }
        rooms.sort_by_key(|info| info.id);
        debug!(count, valid = rooms.len(), "room list received");
        Ok(rooms)
    }

    /// Creates a room and enters it. Returns the new room's id.
    pub async fn create_room(&self, name: &str) -> Result<u32, ClientError> {
        validate_field("room name", name)?;
        self.require("create a room", &[ClientState::Lobby]).await?;
        let reply = self
            .request(
                Message::create_room(name),
                command::ROOM_CREATED,
                self.shared.config.room_timeout(),
            )
            .await?;
        let room_id = reply
            .param(0)
            .and_then(|id| id.parse::<u32>().ok())
            .filter(|id| ROOM_ID_RANGE.contains(id))
            .ok_or_else(|| ClientError::UnexpectedReply(reply.encode()))?;

        self.shared.session.lock().await.on_room_entered(room_id)?;
        info!(room_id, name, "room created");
        watcher::restart(&self.shared);
        Ok(room_id)
    }

    pub async fn join_room(&self, room_id: u32) -> Result<(), ClientError> {
        if !ROOM_ID_RANGE.contains(&room_id) {
            return Err(ClientError::InvalidInput(format!("room id {room_id}")));
        }
        self.require("join a room", &[ClientState::Lobby]).await?;
        self.request(
            Message::join_room(room_id),
            command::JOINED,
            self.shared.config.room_timeout(),
        )
        .await?;

        self.shared.session.lock().await.on_room_entered(room_id)?;
        info!(room_id, "joined room");
        watcher::restart(&self.shared);
        Ok(())
    }

    /// Leaves the room. An `ERROR` reply still returns to the lobby.
    pub async fn leave_room(&self) -> Result<(), ClientError> {
        self.require("leave the room", &[ClientState::InRoom, ClientState::Playing])
            .await?;
        watcher::cancel(&self.shared);

        let result = self
            .request(
                Message::leave_room(),
                command::OK,
                self.shared.config.request_timeout(),
            )
            .await;
        match result {
            Ok(_) => info!("left room"),
            Err(ClientError::Server(text)) => warn!(reason = %text, "leave refused, leaving anyway"),
            Err(e) => return Err(e),
        }
        // A game that started while the leave was in flight is not ours.
        self.shared.sync_queue.remove_all(command::GAME_START);
        self.shared.session.lock().await.on_left_room();
        Ok(())
    }

    // -- Game --------------------------------------------------------------------

    pub async fn hit(&self) -> Result<(), ClientError> {
        self.play("hit", Message::hit()).await
    }

    pub async fn stand(&self) -> Result<(), ClientError> {
        self.play("stand", Message::stand()).await
    }

    /// A serializable copy of everything the session knows.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.shared.session.lock().await.snapshot()
    }

    pub async fn state(&self) -> ClientState {
        self.shared.session.lock().await.state()
    }

    // -- Helpers -------------------------------------------------------------------

    async fn play(&self, operation: &'static str, msg: Message) -> Result<(), ClientError> {
        self.require(operation, &[ClientState::Playing]).await?;
        self.request(msg, command::OK, self.shared.config.request_timeout())
            .await?;
        debug!(operation, "move confirmed");
        Ok(())
    }

    async fn require(
        &self,
        operation: &'static str,
        allowed: &[ClientState],
    ) -> Result<(), ClientError> {
        self.shared
            .session
            .lock()
            .await
            .require(operation, allowed)?;
        Ok(())
    }

    /// Sends `msg` and waits for `expected`. `ERROR` becomes
    /// [`ClientError::Server`].
    async fn request(
        &self,
        msg: Message,
        expected: &'static str,
        timeout: Duration,
    ) -> Result<Message, ClientError> {
        let conn = self.shared.connection().await?;
        let _claim = self.shared.sync_queue.claim();
        conn.send(&msg.encode()).await?;
        debug!(command = %msg.command, expected, "request sent");
        self.await_reply(expected, timeout).await
    }

    async fn await_reply(
        &self,
        expected: &'static str,
        timeout: Duration,
    ) -> Result<Message, ClientError> {
        let reply = self
            .shared
            .sync_queue
            .wait_for(expected, Some(timeout))
            .await
            .ok_or(ClientError::Timeout(expected))?;
        match reply.error_text() {
            Some(text) => Err(ClientError::Server(text.to_string())),
            None => Ok(reply),
        }
    }

    /// Sends an answer to the pending offer and reads the reply straight
    /// from the connection. A refusal drops the offer.
    async fn answer_offer(&self, answer: Message) -> Result<Message, ClientError> {
        {
            let session = self.shared.session.lock().await;
            session.require("answer a reconnect offer", &[ClientState::Connected])?;
            if !session.reconnect_pending() {
                return Err(okobere_session::SessionError::NoPendingReconnect.into());
            }
        }
        let conn = self.shared.connection().await?;
        let reply = handshake::exchange(&self.shared, &conn, answer, &[command::OK]).await?;
        if let Some(text) = reply.error_text() {
            warn!(reason = text, "reconnect answer refused");
            self.shared.session.lock().await.on_reconnect_answer_failed();
            return Err(ClientError::Server(text.to_string()));
        }
        Ok(reply)
    }

    /// Router, heartbeat and processor for an established session.
    fn start_session(&self, conn: Arc<LineConnection>) {
        router::spawn(&self.shared, Arc::clone(&conn));
        reconnect::start_heartbeat(&self.shared, conn);
        processor::spawn(&self.shared);
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        self.shared.manual_disconnect.store(true, Ordering::SeqCst);
        self.shared.stop_all_tasks();
    }
}

/// The token in an `OK|token` reply, or `current` if the reply has none.
fn fresh_token(reply: &Message, current: Option<&str>) -> Result<String, ClientError> {
    reply
        .param(0)
        .filter(|t| !t.is_empty())
        .or(current)
        .map(str::to_string)
        .ok_or_else(|| ClientError::UnexpectedReply(reply.encode()))
}

/// Rejects values that would break the `|`-delimited framing.
fn validate_field(what: &str, value: &str) -> Result<(), ClientError> {
    if value.is_empty() {
        return Err(ClientError::InvalidInput(format!("empty {what}")));
    }
    if value.contains(['|', '\n', '\r']) {
        return Err(ClientError::InvalidInput(format!(
            "{what} contains a reserved character"
        )));
    }
    Ok(())
}
