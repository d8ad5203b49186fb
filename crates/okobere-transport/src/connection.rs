//! Newline-framed TCP connection.
//!
//! The stream is split into owned halves so that one reader task and any
//! number of senders never contend for the same lock:
//!
//! ```text
//!             ┌── reader: Mutex<ReadState> ── receive()  (router only)
//! TcpStream ──┤
//!             └── writer: Mutex<Option<OwnedWriteHalf>> ── send()  (anyone)
//! ```
//!
//! `receive` is bounded by a read timeout. Partially read bytes are kept in
//! a buffer that outlives the timed-out read, so a line split across two
//! TCP segments is reassembled by the next call. That buffer never grows
//! past [`MAX_LINE_LENGTH`]; the rest of a longer line is skipped.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, Notify};
use tokio::time::{self, Instant};

use crate::{ConnectionId, TransportError};

/// Longest line `receive` buffers, terminator included: a 4096-byte
/// message plus `\r\n`.
pub const MAX_LINE_LENGTH: usize = 4096 + 2;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Timeouts for a [`LineConnection`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// How long `connect` waits for the TCP handshake.
    pub connect_timeout: Duration,
    /// How long a single `receive` blocks before reporting "no data yet".
    pub read_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
        }
    }
}

/// Reader half plus the bytes of a line that hasn't been terminated yet.
struct ReadState {
    reader: BufReader<OwnedReadHalf>,
    pending: Vec<u8>,
    /// Bytes of an oversized line skipped so far; 0 while within bounds.
    skipped: usize,
}

enum LineRead {
    Complete,
    TooLong(usize),
    Eof,
}

impl ReadState {
    /// Reads up to the next `\n`, keeping at most [`MAX_LINE_LENGTH`]
    /// bytes. Cancel-safe: progress lives in `self`, not in the future.
    async fn read_line(&mut self) -> io::Result<LineRead> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(LineRead::Eof);
            }
            let (used, terminated) = match available.iter().position(|&b| b == b'\n') {
                Some(end) => (end + 1, true),
                None => (available.len(), false),
            };
            if self.skipped == 0 && self.pending.len() + used <= MAX_LINE_LENGTH {
                self.pending.extend_from_slice(&available[..used]);
            } else {
                self.skipped += self.pending.len() + used;
                self.pending = Vec::new();
            }
            self.reader.consume(used);

            if terminated {
                if self.skipped > 0 {
                    return Ok(LineRead::TooLong(std::mem::take(&mut self.skipped)));
                }
                return Ok(LineRead::Complete);
            }
        }
    }
}

/// A single TCP connection to the game server.
pub struct LineConnection {
    id: ConnectionId,
    addr: String,
    config: ConnectionConfig,
    reader: Mutex<ReadState>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    open: AtomicBool,
    closed: Notify,
    opened_at: Instant,
    /// Milliseconds after `opened_at` at which the last line arrived.
    last_receive_ms: AtomicU64,
}

impl LineConnection {
    /// Opens a connection to `host:port`.
    ///
    /// # Errors
    /// - [`TransportError::ConnectTimeout`] if the handshake doesn't finish
    ///   within `config.connect_timeout`
    /// - [`TransportError::ConnectFailed`] for refused/unreachable peers
    pub async fn connect(
        host: &str,
        port: u16,
        config: ConnectionConfig,
    ) -> Result<Self, TransportError> {
        let addr = format!("{host}:{port}");
        let stream = time::timeout(config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout(addr.clone()))?
            .map_err(|source| TransportError::ConnectFailed {
                addr: addr.clone(),
                source,
            })?;
        // Protocol lines are small and latency matters more than throughput.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::info!(%id, %addr, "connected to server");

        Ok(Self {
            id,
            addr,
            config,
            reader: Mutex::new(ReadState {
                reader: BufReader::new(read_half),
                pending: Vec::new(),
                skipped: 0,
            }),
            writer: Mutex::new(Some(write_half)),
            open: AtomicBool::new(true),
            closed: Notify::new(),
            opened_at: Instant::now(),
            last_receive_ms: AtomicU64::new(0),
        })
    }

    /// Sends one line. The terminator is appended here.
    ///
    /// # Errors
    /// [`TransportError::NotOpen`] if the connection is already closed (no
    /// bytes are written). [`TransportError::SendFailed`] on I/O failure,
    /// which also closes the connection.
    pub async fn send(&self, line: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotOpen)?;

        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(b'\n');

        let result = match writer.write_all(&frame).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            drop(guard);
            tracing::debug!(id = %self.id, error = %e, "send failed, closing");
            self.mark_closed();
            return Err(TransportError::SendFailed(e));
        }
        tracing::trace!(id = %self.id, line, "sent");
        Ok(())
    }

    /// Receives the next line, without its terminator.
    ///
    /// Returns `Ok(None)` when the read timeout elapses with no complete
    /// line. That is not an error; the caller simply polls again.
    ///
    /// Invalid UTF-8 is replaced, and the codec above decides what to do
    /// with the result.
    ///
    /// # Errors
    /// [`TransportError::ConnectionClosed`] on EOF,
    /// [`TransportError::ReceiveFailed`] on I/O failure, and
    /// [`TransportError::NotOpen`] once closed. The first two close the
    /// connection. [`TransportError::LineTooLong`] reports a discarded
    /// line and leaves the connection open.
    pub async fn receive(&self) -> Result<Option<String>, TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let mut guard = self.reader.lock().await;
        let state = &mut *guard;

        let read = tokio::select! {
            _ = self.closed.notified() => return Err(TransportError::NotOpen),
            read = time::timeout(self.config.read_timeout, state.read_line()) => read,
        };

        match read {
            // Timed out; whatever arrived so far stays in `pending`.
            Err(_) => Ok(None),
            Ok(Ok(LineRead::Eof)) => {
                drop(guard);
                tracing::info!(id = %self.id, "server closed the connection");
                self.mark_closed();
                Err(TransportError::ConnectionClosed("end of stream".into()))
            }
            Ok(Ok(LineRead::Complete)) => {
                let line = String::from_utf8_lossy(&state.pending)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                state.pending.clear();
                self.touch();
                Ok(Some(line))
            }
            Ok(Ok(LineRead::TooLong(len))) => {
                self.touch();
                tracing::warn!(id = %self.id, len, "discarded oversized line");
                Err(TransportError::LineTooLong(len))
            }
            Ok(Err(e)) => {
                drop(guard);
                tracing::debug!(id = %self.id, error = %e, "receive failed, closing");
                self.mark_closed();
                Err(TransportError::ReceiveFailed(e))
            }
        }
    }

    /// Closes the connection. Idempotent.
    ///
    /// A `receive` blocked in another task returns [`TransportError::NotOpen`].
    pub async fn close(&self) {
        let was_open = self.open.swap(false, Ordering::AcqRel);
        self.closed.notify_waiters();
        if let Some(mut writer) = self.writer.lock().await.take() {
            // Half-close so the server sees EOF promptly.
            let _ = writer.shutdown().await;
        }
        if was_open {
            tracing::info!(id = %self.id, "connection closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// `host:port` this connection was opened to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// When the most recent line (of any kind) was received, or when the
    /// connection was opened if nothing has arrived yet.
    pub fn last_receive(&self) -> Instant {
        self.opened_at + Duration::from_millis(self.last_receive_ms.load(Ordering::Acquire))
    }

    // -- Internal --------------------------------------------------------

    fn touch(&self) {
        let elapsed = self.opened_at.elapsed().as_millis();
        let elapsed = u64::try_from(elapsed).unwrap_or(u64::MAX);
        self.last_receive_ms.fetch_max(elapsed, Ordering::AcqRel);
    }

    fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
        self.closed.notify_waiters();
    }
}

impl std::fmt::Debug for LineConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineConnection")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("open", &self.is_open())
            .finish()
    }
}
