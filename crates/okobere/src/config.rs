//! Client configuration.
//!
//! Every timing the client uses lives in [`ClientConfig`]. All fields are
//! plain milliseconds so the struct loads from a JSON file; missing fields
//! fall back to the defaults below.

use std::time::Duration;

use okobere_heartbeat::HeartbeatConfig;
use okobere_transport::ConnectionConfig;
use serde::{Deserialize, Serialize};

use crate::reconnect::ReconnectPolicy;

/// Timeouts, heartbeat timing, and reconnect policy.
///
/// ```
/// use okobere::ClientConfig;
///
/// let config: ClientConfig = serde_json::from_str(r#"{ "reconnect_attempts": 3 }"#).unwrap();
/// assert_eq!(config.reconnect_attempts, 3);
/// assert_eq!(config.ping_interval_ms, 5000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// TCP connect timeout.
    pub connect_timeout_ms: u64,
    /// How long one read blocks before the router polls again.
    pub read_timeout_ms: u64,
    /// Wait for the login reply and for reconnect-offer answers.
    pub login_timeout_ms: u64,
    /// Wait for `ROOMS`/`ROOM`, `HIT`/`STAND` and `LEAVE_ROOM` replies.
    pub request_timeout_ms: u64,
    /// Wait for `ROOM_CREATED` and `JOINED`.
    pub room_timeout_ms: u64,

    pub ping_interval_ms: u64,
    /// Silence longer than this declares the connection dead.
    pub silence_timeout_ms: u64,
    pub heartbeat_check_ms: u64,

    pub reconnect_attempts: u32,
    /// Delay before each of the first `reconnect_short_attempts` attempts.
    pub reconnect_short_delay_ms: u64,
    /// Delay before every later attempt.
    pub reconnect_long_delay_ms: u64,
    pub reconnect_short_attempts: u32,

    /// How long to collect messages after a resumption login before
    /// deciding which state to restore.
    pub detection_window_ms: u64,
    /// How long a round result stays on screen.
    pub round_result_pause_ms: u64,
    /// How long the final result stays on screen before the lobby.
    pub game_end_pause_ms: u64,
    /// Upper bound on how long a waiter sleeps between queue scans.
    pub waiter_recheck_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            login_timeout_ms: 5000,
            request_timeout_ms: 5000,
            room_timeout_ms: 10_000,
            ping_interval_ms: 5000,
            silence_timeout_ms: 8000,
            heartbeat_check_ms: 1000,
            reconnect_attempts: 5,
            reconnect_short_delay_ms: 2000,
            reconnect_long_delay_ms: 5000,
            reconnect_short_attempts: 3,
            detection_window_ms: 500,
            round_result_pause_ms: 5000,
            game_end_pause_ms: 5000,
            waiter_recheck_ms: 50,
        }
    }
}

impl ClientConfig {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn room_timeout(&self) -> Duration {
        Duration::from_millis(self.room_timeout_ms)
    }

    pub fn detection_window(&self) -> Duration {
        Duration::from_millis(self.detection_window_ms)
    }

    pub fn round_result_pause(&self) -> Duration {
        Duration::from_millis(self.round_result_pause_ms)
    }

    pub fn game_end_pause(&self) -> Duration {
        Duration::from_millis(self.game_end_pause_ms)
    }

    /// Never zero, so a waiter can't spin.
    pub fn waiter_recheck(&self) -> Duration {
        Duration::from_millis(self.waiter_recheck_ms.max(1))
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms.max(1)),
        }
    }

    /// Heartbeat timing, already clamped by [`HeartbeatConfig::validated`].
    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            ping_interval: Duration::from_millis(self.ping_interval_ms),
            silence_timeout: Duration::from_millis(self.silence_timeout_ms),
            check_interval: Duration::from_millis(self.heartbeat_check_ms),
        }
        .validated()
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.reconnect_attempts,
            short_delay: Duration::from_millis(self.reconnect_short_delay_ms),
            long_delay: Duration::from_millis(self.reconnect_long_delay_ms),
            short_attempts: self.reconnect_short_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn test_default_matches_documented_timings() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.room_timeout(), Duration::from_secs(10));
        assert_eq!(config.detection_window(), Duration::from_millis(500));

        let heartbeat = config.heartbeat();
        assert_eq!(heartbeat.ping_interval, Duration::from_secs(5));
        assert_eq!(heartbeat.silence_timeout, Duration::from_secs(8));
        assert_eq!(heartbeat.check_interval, Duration::from_secs(1));

        let policy = config.reconnect_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_for(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_secs(5)));
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn test_deserialize_partial_json_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{ "room_timeout_ms": 2500, "reconnect_attempts": 2 }"#)
                .unwrap();
        assert_eq!(config.room_timeout_ms, 2500);
        assert_eq!(config.reconnect_attempts, 2);
        assert_eq!(config.silence_timeout_ms, 8000);
    }

    #[test]
    fn test_deserialize_empty_object_is_default() {
        let config: ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let config = ClientConfig {
            read_timeout_ms: 0,
            waiter_recheck_ms: 0,
            ping_interval_ms: 0,
            heartbeat_check_ms: 0,
            ..Default::default()
        };
        assert!(!config.connection().read_timeout.is_zero());
        assert!(!config.waiter_recheck().is_zero());
        assert!(config.heartbeat().ping_interval >= HeartbeatConfig::MIN_INTERVAL);
        assert!(config.heartbeat().check_interval >= HeartbeatConfig::MIN_INTERVAL);
    }
}
