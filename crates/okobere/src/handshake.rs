//! Request/reply exchanges that run before the router owns the connection.
//!
//! A login (and the answer to a reconnect offer) reads the connection
//! directly: the router only starts once the session is established.
//! Anything that isn't the awaited reply is routed into the queues so the
//! state detection after a resumption login can still see it.

use std::sync::Arc;

use okobere_protocol::{Message, ReconnectOffer, command};
use okobere_transport::{LineConnection, TransportError};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::router;
use crate::shared::Shared;

/// A login the server didn't reject.
#[derive(Debug)]
pub(crate) enum LoginReply {
    /// `OK|token`; the session is in the lobby.
    Accepted,
    /// `RECONNECT_QUERY`; the session stays connected with the offer set.
    Offered(ReconnectOffer),
}

/// Sends `request` and reads until a reply in `expected` or `ERROR` arrives.
pub(crate) async fn exchange(
    shared: &Shared,
    conn: &LineConnection,
    request: Message,
    expected: &[&'static str],
) -> Result<Message, ClientError> {
    let awaited = expected.first().copied().unwrap_or(command::OK);
    conn.send(&request.encode()).await?;

    let deadline = Instant::now() + shared.config.login_timeout();
    loop {
        let line = match time::timeout_at(deadline, conn.receive()).await {
            Ok(Err(TransportError::LineTooLong(len))) => {
                warn!(len, "dropping oversized line");
                continue;
            }
            Ok(result) => result?,
            Err(_) => return Err(ClientError::Timeout(awaited)),
        };
        let Some(line) = line else { continue };
        let msg = match Message::decode(&line) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, line, "dropping undecodable line");
                continue;
            }
        };
        if msg.is_error() || expected.iter().any(|cmd| msg.is(cmd)) {
            return Ok(msg);
        }
        debug!(command = %msg.command, "message ahead of reply, routing");
        router::route(shared, msg);
    }
}

/// Sends `LOGIN` and applies the reply to the session.
///
/// A rejection that names the session clears the stored token before the
/// error is returned.
pub(crate) async fn login(
    shared: &Arc<Shared>,
    conn: &LineConnection,
    nickname: &str,
    token: Option<&str>,
) -> Result<LoginReply, ClientError> {
    let reply = exchange(
        shared,
        conn,
        Message::login(nickname, token),
        &[command::OK, command::RECONNECT_QUERY],
    )
    .await?;

    let mut session = shared.session.lock().await;
    if let Some(text) = reply.error_text() {
        session.on_login_rejected(text);
        warn!(nickname, reason = text, "login rejected");
        return Err(ClientError::Server(text.to_string()));
    }

    if reply.is(command::RECONNECT_QUERY) {
        let offer = ReconnectOffer::parse(&reply)?;
        session.on_reconnect_offered(nickname, offer.clone())?;
        return Ok(LoginReply::Offered(offer));
    }

    let new_token = reply
        .param(0)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ClientError::UnexpectedReply(reply.encode()))?;
    session.on_login_accepted(nickname, new_token)?;
    info!(nickname, resumed = token.is_some(), "logged in");
    Ok(LoginReply::Accepted)
}
