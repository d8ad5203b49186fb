//! The inbound read loop.
//!
//! One router task per connection reads lines, decodes them, and sorts
//! them into the two queues. It is the only reader of the connection
//! once a session is established.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use okobere_protocol::{Message, MessageKind};
use okobere_transport::{LineConnection, TransportError};
use tracing::{debug, trace, warn};

use crate::reconnect;
use crate::shared::Shared;

pub(crate) fn spawn(shared: &Arc<Shared>, conn: Arc<LineConnection>) {
    let task = tokio::spawn(run(Arc::clone(shared), conn));
    if let Some(old) = shared.tasks().router.replace(task) {
        old.abort();
    }
}

async fn run(shared: Arc<Shared>, conn: Arc<LineConnection>) {
    debug!(conn = %conn.id(), "router started");
    loop {
        match conn.receive().await {
            Ok(Some(line)) => route_line(&shared, &line),
            // Read timeout: nothing arrived, poll again.
            Ok(None) => {}
            Err(TransportError::LineTooLong(len)) => {
                warn!(conn = %conn.id(), len, "dropping oversized line");
            }
            Err(e) => {
                if shared.manual_disconnect.load(Ordering::SeqCst) {
                    debug!(conn = %conn.id(), "router stopped after disconnect");
                } else {
                    warn!(conn = %conn.id(), error = %e, "read failed");
                    reconnect::connection_lost(&shared, conn.id(), "read failure");
                }
                return;
            }
        }
    }
}

fn route_line(shared: &Shared, line: &str) {
    match Message::decode(line) {
        Ok(msg) => route(shared, msg),
        Err(e) => warn!(error = %e, line, "dropping undecodable line"),
    }
}

/// Puts one decoded message where it belongs. Heartbeat replies are
/// dropped; reading them already refreshed the connection's receive time.
pub(crate) fn route(shared: &Shared, msg: Message) {
    match msg.kind() {
        MessageKind::Heartbeat => trace!("PONG"),
        MessageKind::AsyncEvent => {
            debug!(command = %msg.command, "async event queued");
            shared.async_queue.push(msg);
        }
        MessageKind::SyncReply => {
            debug!(command = %msg.command, "reply queued");
            shared.sync_queue.push(msg);
        }
    }
}
