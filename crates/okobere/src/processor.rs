//! Applies async game events in arrival order.

use std::sync::Arc;

use okobere_protocol::{GameEvent, Message};
use okobere_session::ClientState;
use tokio::time;
use tracing::{debug, info, warn};

use crate::event::ClientEvent;
use crate::shared::{Shared, Tasks};
use crate::watcher;

pub(crate) fn spawn(shared: &Arc<Shared>) {
    spawn_into(&mut shared.tasks(), shared);
}

/// Same as [`spawn`] with the task table already locked.
pub(crate) fn spawn_into(tasks: &mut Tasks, shared: &Arc<Shared>) {
    let task = tokio::spawn(run(Arc::clone(shared)));
    if let Some(old) = tasks.processor.replace(task) {
        old.abort();
    }
}

async fn run(shared: Arc<Shared>) {
    loop {
        let msg = shared.async_queue.pop().await;
        handle(&shared, msg).await;
    }
}

/// Validate, apply, notify, acknowledge, then hold any result pause.
///
/// Pauses run inline, so the next event waits until the current result
/// has been shown.
async fn handle(shared: &Arc<Shared>, msg: Message) {
    let event = match GameEvent::parse(&msg) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "invalid game event, not acknowledged");
            shared.emit(ClientEvent::InvalidServerData(e.to_string()));
            return;
        }
    };

    let state = {
        let mut session = shared.session.lock().await;
        session.apply(&event);
        session.state()
    };
    debug!(command = event.command(), %state, "game event applied");

    if let Some(ack) = Message::ack_for(event.command()) {
        shared.send_detached(ack);
    }

    if let GameEvent::PlayerDisconnected { nickname } = &event {
        if state == ClientState::InRoom {
            info!(opponent = %nickname, "opponent disconnected, waiting for a new game");
            watcher::restart(shared);
        }
    }

    let pause = match event {
        GameEvent::RoundEnd { .. } => Some(Pause::Round),
        GameEvent::GameEnd { .. } => Some(Pause::Game),
        _ => None,
    };
    shared.emit(ClientEvent::Game(event));

    match pause {
        Some(Pause::Round) => {
            time::sleep(shared.config.round_result_pause()).await;
            shared.emit(ClientEvent::RoundResultHidden);
        }
        Some(Pause::Game) => {
            time::sleep(shared.config.game_end_pause()).await;
            let back = {
                let mut session = shared.session.lock().await;
                // Leaving or disconnecting during the pause already moved on.
                let in_game = session.state().in_room_or_game();
                if in_game {
                    session.reset_to_lobby();
                }
                in_game
            };
            if back {
                info!("game over, back in the lobby");
                shared.emit(ClientEvent::ReturnedToLobby);
            }
        }
        None => {}
    }
}

enum Pause {
    Round,
    Game,
}
