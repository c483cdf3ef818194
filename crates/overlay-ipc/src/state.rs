//! Connection and overlay state types.

use serde::{Deserialize, Serialize};

/// Status of the live event stream connection.
///
/// Exactly one value is current at a time. `Offline` and transient `Error`
/// return to `Connecting` on their own once the retry countdown elapses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No connection attempt has been made yet.
    #[default]
    Idle,

    /// A socket is being opened.
    Connecting,

    /// The socket is open and events are flowing.
    Connected,

    /// The target stream is not live.
    Offline,

    /// The connection failed or was closed unexpectedly.
    Error,
}

impl ConnectionStatus {
    /// Returns true if events are flowing.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns a simple string representation of the status.
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

/// Countdown until the next automatic reconnection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    /// Full retry delay in seconds.
    pub interval_seconds: u32,

    /// Seconds left before the retry fires. Never underflows.
    pub remaining_seconds: u32,
}

impl RetryState {
    /// Start a countdown from `interval_seconds`.
    pub fn new(interval_seconds: u32) -> Self {
        Self {
            interval_seconds,
            remaining_seconds: interval_seconds,
        }
    }

    /// Advance the countdown by one second, clamped at zero.
    ///
    /// Returns true once the countdown has elapsed.
    pub fn tick(&mut self) -> bool {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.remaining_seconds == 0
    }
}

/// Point-in-time view of the connection, as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    /// Current status.
    pub status: ConnectionStatus,

    /// Human-readable error or offline message.
    pub error: Option<String>,

    /// Pending automatic retry, if one is scheduled.
    pub retry: Option<RetryState>,
}

impl ConnectionSnapshot {
    /// Seconds until the next automatic retry, or zero if none is scheduled.
    pub fn retry_countdown(&self) -> u32 {
        self.retry.map_or(0, |r| r.remaining_seconds)
    }

    /// Get status message for UI.
    pub fn message(&self) -> String {
        match (self.status, &self.error) {
            (ConnectionStatus::Idle, _) => "Idle".to_string(),
            (ConnectionStatus::Connecting, _) => "Connecting...".to_string(),
            (ConnectionStatus::Connected, _) => "Connected".to_string(),
            (ConnectionStatus::Offline, _) => format!(
                "Waiting for stream to go live (retrying in {}s)",
                self.retry_countdown()
            ),
            (ConnectionStatus::Error, error) => {
                let error = error.as_deref().unwrap_or("Connection error");
                match self.retry {
                    Some(retry) if retry.remaining_seconds > 0 => {
                        format!("{error} (retrying in {}s)", retry.remaining_seconds)
                    }
                    _ => error.to_string(),
                }
            }
        }
    }
}

/// Load/mount state of the overlay module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayState {
    /// No module has been loaded yet.
    #[default]
    NotLoaded,

    /// Module is loaded and verified but not mounted.
    Loaded,

    /// Module is mounted and receiving events.
    Mounted,

    /// Module failed to load or to satisfy the mount contract.
    Failed { message: String },
}

impl OverlayState {
    /// Returns true if the overlay is mounted.
    pub fn is_mounted(&self) -> bool {
        matches!(self, Self::Mounted)
    }

    /// Returns true if loading or mounting failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Combined host state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostState {
    /// Connection snapshot.
    pub connection: ConnectionSnapshot,

    /// Overlay state.
    pub overlay: OverlayState,
}
