//! Automatic reconnection.
//!
//! When the router or the heartbeat declares the connection dead,
//! [`connection_lost`] starts one coordinator task. The coordinator tears
//! down the old connection, then retries a resumption login (the stored
//! nickname and token) with backoff until one succeeds, the attempts run
//! out, or the user disconnects.
//!
//! ```text
//!   loss ──→ stop tasks, close, clear queues, CONNECTED
//!              │
//!              ├─ attempt n: sleep(delay_for(n)) → connect → LOGIN|nick|token
//!              │     OK              → establish (detect state) → Reconnected
//!              │     RECONNECT_QUERY → ReconnectOffered (user decides)
//!              │     ERROR / I/O     → next attempt
//!              └─ out of attempts  → ReconnectFailed
//! ```

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use okobere_protocol::{Message, command};
use okobere_session::ClientState;
use okobere_transport::{ConnectionId, LineConnection};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::error::ClientError;
use crate::event::ClientEvent;
use crate::handshake::{self, LoginReply};
use crate::shared::Shared;
use crate::{processor, router, watcher};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// How many attempts to make and how long to wait before each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub short_delay: Duration,
    pub long_delay: Duration,
    /// Attempts `1..=short_attempts` wait `short_delay`; later ones wait
    /// `long_delay`.
    pub short_attempts: u32,
}

impl ReconnectPolicy {
    /// The delay before attempt `attempt` (1-based), or `None` past the
    /// last attempt.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            None
        } else if attempt <= self.short_attempts {
            Some(self.short_delay)
        } else {
            Some(self.long_delay)
        }
    }
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

/// Called by the router and the heartbeat when connection `lost` died.
///
/// Does nothing after a manual disconnect, for a connection that has
/// already been replaced, or while a coordinator is running.
pub(crate) fn connection_lost(shared: &Arc<Shared>, lost: ConnectionId, reason: &'static str) {
    if shared.manual_disconnect.load(Ordering::SeqCst) {
        debug!(conn = %lost, reason, "connection closed by user, not reconnecting");
        return;
    }
    if !shared.is_current(lost) {
        debug!(conn = %lost, reason, "stale connection, ignoring");
        return;
    }
    if shared.reconnecting.swap(true, Ordering::SeqCst) {
        debug!(conn = %lost, reason, "reconnect already in progress");
        return;
    }
    warn!(conn = %lost, reason, "connection lost, reconnecting");
    spawn_coordinator(shared);
}

/// User-initiated retry, typically after [`ClientEvent::ReconnectFailed`].
pub(crate) fn retry(shared: &Arc<Shared>) -> Result<(), ClientError> {
    if shared.endpoint().is_none() {
        return Err(ClientError::NotConnected);
    }
    if shared.reconnecting.swap(true, Ordering::SeqCst) {
        return Err(ClientError::ReconnectInProgress);
    }
    shared.manual_disconnect.store(false, Ordering::SeqCst);
    info!("manual reconnect requested");
    spawn_coordinator(shared);
    Ok(())
}

fn spawn_coordinator(shared: &Arc<Shared>) {
    let task = tokio::spawn(run(Arc::clone(shared)));
    if let Some(old) = shared.tasks().reconnect.replace(task) {
        old.abort();
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

async fn run(shared: Arc<Shared>) {
    shared.stop_session_tasks();
    if let Some(conn) = shared.take_connection().await {
        conn.close().await;
    }
    shared.sync_queue.clear();
    shared.async_queue.clear();

    let prior = {
        let mut session = shared.session.lock().await;
        let was = session.begin_resume();
        shared.remember_resume_target(was)
    };
    shared.emit(ClientEvent::ConnectionLost);

    let policy = shared.config.reconnect_policy();
    let mut attempt = 1;
    while let Some(delay) = policy.delay_for(attempt) {
        info!(
            attempt,
            max = policy.max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "waiting before reconnect attempt"
        );
        shared.emit(ClientEvent::Reconnecting {
            attempt,
            max_attempts: policy.max_attempts,
        });
        time::sleep(delay).await;

        if shared.manual_disconnect.load(Ordering::SeqCst) {
            info!("reconnect cancelled by disconnect");
            shared.reconnecting.store(false, Ordering::SeqCst);
            return;
        }

        match attempt_once(&shared, prior).await {
            Ok(()) => return,
            Err(e) => warn!(attempt, error = %e, "reconnect attempt failed"),
        }
        attempt += 1;
    }

    error!(attempts = policy.max_attempts, "could not reconnect, giving up");
    shared.reconnecting.store(false, Ordering::SeqCst);
    shared.emit(ClientEvent::ReconnectFailed);
}

/// One connect + resumption login. On success the outcome has already
/// been reported.
async fn attempt_once(shared: &Arc<Shared>, prior: ClientState) -> Result<(), ClientError> {
    let (host, port) = shared.endpoint().ok_or(ClientError::NotConnected)?;
    let (nickname, token) = {
        let session = shared.session.lock().await;
        let nickname = session.nickname().ok_or(ClientError::NotConnected)?;
        (nickname.to_string(), session.token().map(str::to_string))
    };

    // Leftovers of a failed attempt must not leak into detection.
    shared.sync_queue.clear();
    shared.async_queue.clear();

    let conn = Arc::new(LineConnection::connect(&host, port, shared.config.connection()).await?);
    match handshake::login(shared, &conn, &nickname, token.as_deref()).await {
        Ok(LoginReply::Accepted) => {
            // From here a new loss must start a fresh coordinator.
            shared.reconnecting.store(false, Ordering::SeqCst);
            shared.clear_resume_target();
            let Some(state) = establish(shared, conn, prior).await else {
                info!("disconnected while restoring the session");
                return Ok(());
            };
            info!(%state, "reconnected");
            shared.emit(ClientEvent::Reconnected { state });
            start_processing(shared, state);
            Ok(())
        }
        Ok(LoginReply::Offered(offer)) => {
            shared.install_connection(conn).await;
            shared.reconnecting.store(false, Ordering::SeqCst);
            shared.clear_resume_target();
            shared.emit(ClientEvent::ReconnectOffered(offer));
            Ok(())
        }
        Err(e) => {
            conn.close().await;
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Session establishment
// ---------------------------------------------------------------------------

/// Installs a freshly logged-in connection, starts its router and
/// heartbeat, and decides which state to restore. Nothing consumes the
/// queues until [`start_processing`].
///
/// The server's first messages tell whether the game survived: a queued
/// `GAME_START` resumes `PLAYING`, a queued `PLAYER_DISCONNECTED` resumes
/// `IN_ROOM`, and anything else means the lobby. Losing a room that way
/// is reported as [`ClientEvent::ServerRestarted`].
///
/// Returns `None` without touching the session if the user disconnected,
/// or the connection was replaced, during detection.
pub(crate) async fn establish(
    shared: &Arc<Shared>,
    conn: Arc<LineConnection>,
    prior: ClientState,
) -> Option<ClientState> {
    let id = conn.id();
    shared.install_connection(Arc::clone(&conn)).await;
    router::spawn(shared, Arc::clone(&conn));
    start_heartbeat(shared, Arc::clone(&conn));

    time::sleep(shared.config.detection_window()).await;
    let game_running = shared.sync_queue.contains(command::GAME_START);
    let opponent_gone = shared.async_queue.contains(command::PLAYER_DISCONNECTED);

    let state = {
        let mut session = shared.session.lock().await;
        // `disconnect` sets the flag before it takes this lock.
        if shared.manual_disconnect.load(Ordering::SeqCst) || !shared.is_current(id) {
            debug!(conn = %id, "session gone during state detection");
            drop(session);
            discard(shared, &conn).await;
            return None;
        }
        if game_running {
            session.resume_as(ClientState::Playing);
        } else if opponent_gone {
            session.resume_as(ClientState::InRoom);
        } else {
            session.reset_to_lobby();
            if prior.in_room_or_game() {
                warn!(%prior, "room is gone, server was probably restarted");
                shared.emit(ClientEvent::ServerRestarted);
            }
        }
        session.state()
    };
    debug!(game_running, opponent_gone, %state, "state detection finished");
    Some(state)
}

/// Undoes `establish` for `conn` if it is still installed after a
/// disconnect that raced it.
async fn discard(shared: &Arc<Shared>, conn: &LineConnection) {
    if !shared.manual_disconnect.load(Ordering::SeqCst) || !shared.is_current(conn.id()) {
        return;
    }
    shared.stop_session_tasks();
    if let Some(installed) = shared.take_connection().await {
        if let Err(e) = installed.send(&Message::disconnect().encode()).await {
            debug!(error = %e, "DISCONNECT not delivered");
        }
        installed.close().await;
    }
    conn.close().await;
}

/// Starts consuming the queues once the restored `state` has been
/// reported. A resumed game still has its `GAME_START` queued.
///
/// Does nothing after a manual disconnect.
pub(crate) fn start_processing(shared: &Arc<Shared>, state: ClientState) {
    // Checked under the task lock: `disconnect` sets the flag before it
    // takes the lock to stop tasks, so nothing spawned here outlives it.
    let mut tasks = shared.tasks();
    if shared.manual_disconnect.load(Ordering::SeqCst) {
        debug!("disconnected, not starting event processing");
        return;
    }
    if state == ClientState::Playing {
        watcher::spawn_into(&mut tasks, shared);
    }
    processor::spawn_into(&mut tasks, shared);
}

/// Starts the heartbeat for `conn`; its silence verdict feeds
/// [`connection_lost`].
pub(crate) fn start_heartbeat(shared: &Arc<Shared>, conn: Arc<LineConnection>) {
    let id = conn.id();
    let weak = Arc::downgrade(shared);
    let heartbeat = okobere_heartbeat::spawn(conn, shared.config.heartbeat(), move || {
        if let Some(shared) = weak.upgrade() {
            connection_lost(&shared, id, "heartbeat timeout");
        }
    });
    if let Some(old) = shared.tasks().heartbeat.replace(heartbeat) {
        old.stop();
    }
}
