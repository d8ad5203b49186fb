//! Integration tests for automatic reconnection.

mod common;

use std::time::Duration;

use common::{FakeServer, fast_config, logged_in, next_event, playing};
use okobere::{ClientConfig, ClientError, ClientEvent, ClientState};

// =========================================================================
// Recovery after a dropped connection
// =========================================================================

#[tokio::test]
async fn test_dropped_connection_resumes_running_game() {
    let server = FakeServer::start().await;
    let (client, mut events, mut peer) = logged_in(&server, fast_config()).await;
    playing(&client, &mut events, &mut peer).await;

    drop(peer);
    next_event(&mut events, |e| matches!(e, ClientEvent::ConnectionLost)).await;

    let mut peer = server.accept().await;
    peer.expect("LOGIN|alice|tok1").await;
    peer.send("OK|tok1").await;
    peer.send("GAME_START|PLAYER|bob").await;

    let reconnected =
        next_event(&mut events, |e| matches!(e, ClientEvent::Reconnected { .. })).await;
    assert_eq!(
        reconnected,
        ClientEvent::Reconnected {
            state: ClientState::Playing
        }
    );
    next_event(&mut events, |e| matches!(e, ClientEvent::GameStarted(_))).await;

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.state, ClientState::Playing);
    assert_eq!(snapshot.room_id, Some(5));
    assert!(!client.is_reconnecting());
}

#[tokio::test]
async fn test_dropped_connection_resumes_room_when_opponent_gone() {
    let server = FakeServer::start().await;
    let (client, mut events, mut peer) = logged_in(&server, fast_config()).await;
    playing(&client, &mut events, &mut peer).await;

    drop(peer);
    let mut peer = server.accept().await;
    peer.expect("LOGIN|alice|tok1").await;
    peer.send("OK|tok1").await;
    peer.send("PLAYER_DISCONNECTED|bob").await;

    let reconnected =
        next_event(&mut events, |e| matches!(e, ClientEvent::Reconnected { .. })).await;
    assert_eq!(
        reconnected,
        ClientEvent::Reconnected {
            state: ClientState::InRoom
        }
    );
    assert_eq!(client.snapshot().await.room_id, Some(5));
}

#[tokio::test]
async fn test_dropped_connection_without_game_reports_server_restart() {
    let server = FakeServer::start().await;
    let (client, mut events, mut peer) = logged_in(&server, fast_config()).await;
    playing(&client, &mut events, &mut peer).await;

    drop(peer);
    let mut peer = server.accept().await;
    peer.expect("LOGIN|alice|tok1").await;
    peer.send("OK|tok1").await;

    next_event(&mut events, |e| matches!(e, ClientEvent::ServerRestarted)).await;
    let reconnected =
        next_event(&mut events, |e| matches!(e, ClientEvent::Reconnected { .. })).await;
    assert_eq!(
        reconnected,
        ClientEvent::Reconnected {
            state: ClientState::Lobby
        }
    );
    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.room_id, None);
    assert!(snapshot.opponent.is_none());
}

#[tokio::test]
async fn test_lobby_reconnect_is_silent() {
    let server = FakeServer::start().await;
    let (client, mut events, peer) = logged_in(&server, fast_config()).await;

    drop(peer);
    let mut peer = server.accept().await;
    peer.expect("LOGIN|alice|tok1").await;
    peer.send("OK|tok1").await;

    let event = next_event(&mut events, |e| {
        matches!(
            e,
            ClientEvent::Reconnected { .. } | ClientEvent::ServerRestarted
        )
    })
    .await;
    assert_eq!(
        event,
        ClientEvent::Reconnected {
            state: ClientState::Lobby
        }
    );
    assert_eq!(client.state().await, ClientState::Lobby);
}

#[tokio::test]
async fn test_reconnect_retries_after_rejected_login() {
    let server = FakeServer::start().await;
    let (client, mut events, peer) = logged_in(&server, fast_config()).await;

    drop(peer);
    let mut first = server.accept().await;
    first.expect("LOGIN|alice|tok1").await;
    first.send("ERROR|Invalid session").await;

    // The token was rejected, so the next attempt logs in fresh.
    let mut second = server.accept().await;
    second.expect("LOGIN|alice").await;
    second.send("OK|tok2").await;

    next_event(&mut events, |e| matches!(e, ClientEvent::Reconnected { .. })).await;
    assert_eq!(client.state().await, ClientState::Lobby);
    assert!(client.snapshot().await.has_token);
}

#[tokio::test]
async fn test_reconnect_offer_during_recovery() {
    let server = FakeServer::start().await;
    let (client, mut events, peer) = logged_in(&server, fast_config()).await;

    drop(peer);
    let mut peer = server.accept().await;
    peer.expect("LOGIN|alice|tok1").await;
    peer.send("RECONNECT_QUERY|5|bob").await;

    let offered =
        next_event(&mut events, |e| matches!(e, ClientEvent::ReconnectOffered(_))).await;
    let ClientEvent::ReconnectOffered(offer) = offered else {
        unreachable!()
    };
    assert_eq!(offer.room_id, 5);
    assert!(!client.is_reconnecting());

    let (result, ()) = tokio::join!(client.accept_reconnect(), async {
        peer.expect("RECONNECT_ACCEPT").await;
        peer.send("OK|tok1").await;
    });
    result.unwrap();
    assert_eq!(client.state().await, ClientState::Playing);
}

// =========================================================================
// Giving up and manual control
// =========================================================================

#[tokio::test]
async fn test_reconnect_gives_up_after_max_attempts() {
    let server = FakeServer::start().await;
    let (client, mut events, peer) = logged_in(&server, fast_config()).await;
    let port = server.port;

    // Nobody listens any more: every attempt is refused.
    drop(server);
    drop(peer);

    let mut attempts = Vec::new();
    loop {
        match next_event(&mut events, |e| {
            matches!(
                e,
                ClientEvent::Reconnecting { .. } | ClientEvent::ReconnectFailed
            )
        })
        .await
        {
            ClientEvent::Reconnecting { attempt, .. } => attempts.push(attempt),
            _ => break,
        }
    }
    assert_eq!(attempts, [1, 2, 3]);
    assert!(!client.is_reconnecting());
    assert_eq!(client.state().await, ClientState::Connected);

    // A manual retry starts a new round against a fresh server on the
    // same port.
    let Ok(listener) = tokio::net::TcpListener::bind(("127.0.0.1", port)).await else {
        // Port reused by someone else; nothing more to check.
        return;
    };
    client.retry_reconnect().unwrap();
    assert!(matches!(
        client.retry_reconnect(),
        Err(ClientError::ReconnectInProgress)
    ));
    let accepted = tokio::time::timeout(Duration::from_secs(5), listener.accept()).await;
    assert!(accepted.is_ok());
}

#[tokio::test]
async fn test_disconnect_during_backoff_stops_attempts() {
    let server = FakeServer::start().await;
    let config = ClientConfig {
        reconnect_short_delay_ms: 300,
        ..fast_config()
    };
    let (client, mut events, peer) = logged_in(&server, config).await;

    drop(peer);
    next_event(&mut events, |e| matches!(e, ClientEvent::Reconnecting { .. })).await;
    client.disconnect().await;

    assert!(server.try_accept(Duration::from_millis(800)).await.is_none());
    assert_eq!(client.state().await, ClientState::Disconnected);
    assert!(!client.is_reconnecting());
}

#[tokio::test]
async fn test_silent_server_triggers_reconnect() {
    let server = FakeServer::start().await;
    let config = ClientConfig {
        ping_interval_ms: 100,
        silence_timeout_ms: 300,
        heartbeat_check_ms: 50,
        ..fast_config()
    };
    let (_client, mut events, _peer) = logged_in(&server, config).await;

    // `_peer` stays open but never answers the pings.
    next_event(&mut events, |e| matches!(e, ClientEvent::ConnectionLost)).await;
    let mut peer = server.accept().await;
    peer.expect("LOGIN|alice|tok1").await;
}
