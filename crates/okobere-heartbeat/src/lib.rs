//! Keep-alive pings and silence-based failure detection.
//!
//! While a session is established the client sends `PING` on a fixed
//! interval and watches how long it has been since *anything* arrived
//! from the server. Once that silence exceeds the timeout, the monitor
//! invokes its failure callback exactly once and stops.
//!
//! The monitor never closes the connection itself. It only signals, and
//! whoever owns the connection decides what to do (normally: reconnect).
//!
//! # Integration
//!
//! ```ignore
//! let handle = okobere_heartbeat::spawn(Arc::clone(&conn), HeartbeatConfig::default(), move || {
//!     coordinator.connection_lost("heartbeat silence");
//! });
//! // ...
//! handle.stop();
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use okobere_protocol::Message;
use okobere_transport::{LineConnection, TransportError};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timing for the heartbeat monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between two `PING`s.
    pub ping_interval: Duration,
    /// The peer is declared dead once silence exceeds this (strictly).
    pub silence_timeout: Duration,
    /// How often silence is measured.
    pub check_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(5),
            silence_timeout: Duration::from_secs(8),
            check_interval: Duration::from_secs(1),
        }
    }
}

impl HeartbeatConfig {
    /// Shortest interval accepted for pinging and checking.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`spawn`]. Rules:
    /// - both intervals are at least [`Self::MIN_INTERVAL`]
    ///   (`tokio::time::interval` panics on zero)
    /// - `check_interval` is at most `silence_timeout`
    /// - `ping_interval` is below `silence_timeout`, otherwise a quiet but
    ///   healthy server would be declared dead between two pings
    pub fn validated(mut self) -> Self {
        self.ping_interval = self.ping_interval.max(Self::MIN_INTERVAL);
        self.check_interval = self.check_interval.max(Self::MIN_INTERVAL);
        if self.silence_timeout < self.check_interval {
            warn!(
                silence_ms = millis(self.silence_timeout),
                check_ms = millis(self.check_interval),
                "silence_timeout shorter than check_interval, raising"
            );
            self.silence_timeout = self.check_interval;
        }
        if self.ping_interval >= self.silence_timeout {
            warn!(
                ping_ms = millis(self.ping_interval),
                silence_ms = millis(self.silence_timeout),
                "ping_interval not below silence_timeout, lowering"
            );
            self.ping_interval = (self.silence_timeout / 2).max(Self::MIN_INTERVAL);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Peer
// ---------------------------------------------------------------------------

/// What the monitor needs from a connection.
///
/// Implemented for [`LineConnection`]; tests substitute a fake with a
/// controllable clock.
pub trait Peer: Send + Sync + 'static {
    /// Sends one keep-alive ping.
    fn ping(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// When the last inbound message of any kind arrived.
    fn last_receive(&self) -> Instant;
}

impl Peer for LineConnection {
    async fn ping(&self) -> Result<(), TransportError> {
        self.send(&Message::ping().encode()).await
    }

    fn last_receive(&self) -> Instant {
        LineConnection::last_receive(self)
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Handle to a running monitor. Dropping it stops the monitor.
#[derive(Debug)]
pub struct HeartbeatHandle {
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Stops the monitor. The failure callback will not run afterwards.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// `true` once the monitor stopped, either by [`stop`](Self::stop) or
    /// after declaring the peer dead.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Starts monitoring `peer`.
///
/// Pings go out every `ping_interval`; the first one after one full
/// interval. Send failures are logged and otherwise ignored, since a dead
/// connection shows up as silence anyway.
pub fn spawn<P, F>(peer: Arc<P>, config: HeartbeatConfig, on_dead: F) -> HeartbeatHandle
where
    P: Peer,
    F: FnOnce() + Send + 'static,
{
    let config = config.validated();
    debug!(
        ping_ms = millis(config.ping_interval),
        silence_ms = millis(config.silence_timeout),
        "heartbeat monitor started"
    );

    let task = tokio::spawn(async move {
        let mut on_dead = Some(on_dead);
        let start = Instant::now();
        let mut ping = time::interval_at(start + config.ping_interval, config.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut check = time::interval_at(start + config.check_interval, config.check_interval);
        check.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ping.tick() => {
                    match peer.ping().await {
                        Ok(()) => trace!("ping sent"),
                        Err(e) => debug!(error = %e, "ping failed"),
                    }
                }
                _ = check.tick() => {
                    let silence = peer.last_receive().elapsed();
                    if silence > config.silence_timeout {
                        warn!(
                            silence_ms = millis(silence),
                            "no message from server, declaring connection dead"
                        );
                        if let Some(on_dead) = on_dead.take() {
                            on_dead();
                        }
                        return;
                    }
                }
            }
        }
    });

    HeartbeatHandle { task }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

