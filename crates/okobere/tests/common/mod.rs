//! A scripted stand-in for the game server.

#![allow(dead_code)]

use std::time::Duration;

use okobere::{ClientConfig, ClientEvent, GameClient, LoginOutcome};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time;

pub const WAIT: Duration = Duration::from_secs(5);

/// Short timings so reconnect and pause paths finish quickly.
pub fn fast_config() -> ClientConfig {
    ClientConfig {
        read_timeout_ms: 50,
        login_timeout_ms: 1000,
        request_timeout_ms: 1000,
        room_timeout_ms: 1000,
        reconnect_attempts: 3,
        reconnect_short_delay_ms: 100,
        reconnect_long_delay_ms: 200,
        reconnect_short_attempts: 2,
        detection_window_ms: 100,
        round_result_pause_ms: 100,
        game_end_pause_ms: 100,
        waiter_recheck_ms: 10,
        ..ClientConfig::default()
    }
}

pub struct FakeServer {
    listener: TcpListener,
    pub port: u16,
}

impl FakeServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        Self { listener, port }
    }

    pub async fn accept(&self) -> Peer {
        self.try_accept(WAIT).await.expect("client did not connect")
    }

    pub async fn try_accept(&self, within: Duration) -> Option<Peer> {
        let (stream, _) = time::timeout(within, self.listener.accept())
            .await
            .ok()?
            .expect("accept");
        let (read, writer) = stream.into_split();
        Some(Peer {
            lines: BufReader::new(read).lines(),
            writer,
        })
    }
}

/// The server's end of one client connection.
pub struct Peer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Peer {
    /// Next line from the client, skipping heartbeat pings.
    pub async fn recv(&mut self) -> String {
        self.try_recv(WAIT).await.expect("no line from client")
    }

    pub async fn try_recv(&mut self, within: Duration) -> Option<String> {
        loop {
            let line = time::timeout(within, self.lines.next_line())
                .await
                .ok()?
                .expect("read")?;
            if line != "PING" {
                return Some(line);
            }
        }
    }

    pub async fn expect(&mut self, line: &str) {
        assert_eq!(self.recv().await, line);
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write");
    }
}

/// Waits for the first event matching `pred`, discarding the others.
pub async fn next_event<F>(events: &mut UnboundedReceiver<ClientEvent>, pred: F) -> ClientEvent
where
    F: Fn(&ClientEvent) -> bool,
{
    time::timeout(WAIT, async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event did not arrive")
}

/// Connects and logs in as `alice` with token `tok1`.
pub async fn logged_in(
    server: &FakeServer,
    config: ClientConfig,
) -> (GameClient, UnboundedReceiver<ClientEvent>, Peer) {
    let (client, events) = GameClient::new(config);
    client.connect("127.0.0.1", server.port).await.expect("connect");
    let mut peer = server.accept().await;

    let (outcome, ()) = tokio::join!(client.login("alice", None), async {
        peer.expect("LOGIN|alice").await;
        peer.send("OK|tok1").await;
    });
    assert_eq!(
        outcome.expect("login"),
        LoginOutcome::LoggedIn(okobere::ClientState::Lobby)
    );
    (client, events, peer)
}

/// From the lobby into a running game (room 5, opponent bob).
pub async fn playing(
    client: &GameClient,
    events: &mut UnboundedReceiver<ClientEvent>,
    peer: &mut Peer,
) {
    let (room, ()) = tokio::join!(client.create_room("Kuchyne"), async {
        peer.expect("CREATE_ROOM|Kuchyne").await;
        peer.send("ROOM_CREATED|5").await;
    });
    assert_eq!(room.expect("create room"), 5);

    peer.send("GAME_START|PLAYER|bob").await;
    next_event(events, |e| matches!(e, ClientEvent::GameStarted(_))).await;
}
