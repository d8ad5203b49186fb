//! Waits for `GAME_START` while the player sits in a room.

use std::sync::Arc;

use okobere_protocol::{GameStart, command};
use tracing::{info, warn};

use crate::event::ClientEvent;
use crate::shared::{Shared, Tasks};

/// Starts a watcher, replacing any running one.
pub(crate) fn restart(shared: &Arc<Shared>) {
    spawn_into(&mut shared.tasks(), shared);
}

/// Same as [`restart`] with the task table already locked.
pub(crate) fn spawn_into(tasks: &mut Tasks, shared: &Arc<Shared>) {
    let task = tokio::spawn(run(Arc::clone(shared)));
    if let Some(old) = tasks.watcher.replace(task) {
        old.abort();
    }
}

/// Stops the watcher. A `GAME_START` it never took is dropped with it.
pub(crate) fn cancel(shared: &Shared) {
    if let Some(old) = shared.tasks().watcher.take() {
        old.abort();
    }
    shared.sync_queue.remove_all(command::GAME_START);
}

async fn run(shared: Arc<Shared>) {
    // No timeout: the opponent may take arbitrarily long to show up.
    let msg = loop {
        let msg = shared.sync_queue.wait_for_unclaimed(command::GAME_START).await;
        if !msg.is_error() {
            break msg;
        }
        let text = msg.error_text().unwrap_or_default();
        warn!(reason = text, "error while waiting for game start");
        shared.emit(ClientEvent::ServerError(text.to_string()));
    };

    let start = match GameStart::parse(&msg) {
        Ok(start) => start,
        Err(e) => {
            warn!(error = %e, "invalid GAME_START");
            shared.emit(ClientEvent::InvalidServerData(e.to_string()));
            return;
        }
    };

    let applied = shared.session.lock().await.on_game_start(start.clone());
    match applied {
        Ok(()) => {
            info!(role = %start.role.as_str(), opponent = %start.opponent, "game started");
            shared.emit(ClientEvent::GameStarted(start));
        }
        Err(e) => warn!(error = %e, "ignoring GAME_START"),
    }
}
