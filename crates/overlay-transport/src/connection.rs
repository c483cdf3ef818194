//! Close-code policy and retry timing.

use std::time::Duration;

use crate::error::ConnectionError;
use crate::DEFAULT_RETRY_INTERVAL_SECS;

/// Close code sent when the target stream is not live.
pub const NOT_LIVE: u16 = 4404;

/// Close code sent when the credentials were rejected.
pub const INVALID_AUTH: u16 = 4401;

/// Close code reported when the socket dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code reported when a close frame carried no status.
pub const NO_STATUS: u16 = 1005;

/// Classification of a close code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Target not currently live. Retried automatically.
    Offline,

    /// Credentials rejected. Needs user action.
    Unauthorized,

    /// Anything else. Retried automatically.
    Transient(u16),
}

impl CloseKind {
    /// Classify a close code.
    pub fn from_code(code: u16) -> Self {
        match code {
            NOT_LIVE => Self::Offline,
            INVALID_AUTH => Self::Unauthorized,
            other => Self::Transient(other),
        }
    }

    /// The error surfaced for this close.
    pub fn error(self) -> ConnectionError {
        match self {
            Self::Offline => ConnectionError::Offline,
            Self::Unauthorized => ConnectionError::Unauthorized,
            Self::Transient(code) => ConnectionError::Transient { code },
        }
    }
}

/// Reconnection policy configuration.
///
/// One timer drives both the visible countdown and the retry itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Seconds between a disconnect and the automatic reconnect.
    pub interval_secs: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given interval.
    pub fn new(interval_secs: u32) -> Self {
        Self { interval_secs }
    }

    /// Whether a close of this kind schedules an automatic retry.
    pub fn should_retry(&self, kind: CloseKind) -> bool {
        !matches!(kind, CloseKind::Unauthorized)
    }

    /// Countdown tick period.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1)
    }
}
