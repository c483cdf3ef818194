//! Common types used across IPC messages.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Plain JSON configuration object handed to an overlay.
pub type OverlayConfig = serde_json::Map<String, serde_json::Value>;

/// Default event stream endpoint.
pub const DEFAULT_ENDPOINT: &str = "wss://ws.eulerstream.com";

/// Default delay before an automatic reconnect, in seconds.
pub const DEFAULT_RETRY_INTERVAL_SECS: u32 = 30;

/// Settings for the live event stream connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// WebSocket endpoint (ws:// or wss://).
    pub endpoint: String,

    /// Unique id of the streamer whose events are relayed.
    pub unique_id: String,

    /// JWT used to authenticate against the endpoint.
    pub jwt_key: String,

    /// Delay before an automatic reconnect, in seconds (default: 30).
    pub retry_interval_secs: u32,

    /// Event schema version requested from the server (default: 2).
    pub schema_version: u8,

    /// Ask the server to batch events into one frame (default: true).
    pub bundle_events: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            unique_id: String::new(),
            jwt_key: String::new(),
            retry_interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
            schema_version: 2,
            bundle_events: true,
        }
    }
}

impl ConnectionConfig {
    /// Both the streamer id and the key are required before connecting.
    pub fn has_credentials(&self) -> bool {
        !self.unique_id.trim().is_empty() && !self.jwt_key.trim().is_empty()
    }
}

/// Configuration for a display host session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayConfig {
    /// Event stream connection.
    pub connection: ConnectionConfig,

    /// Location of the overlay bundle (e.g. "builtin://chat-log").
    pub bundle_url: String,

    /// Manifest file used for config defaults when the module exports none.
    pub manifest_path: Option<PathBuf>,

    /// Stored overrides, merged over the manifest defaults.
    pub overlay_config: OverlayConfig,
}

/// Connection statistics reported while connected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStats {
    /// WebSocket data frames received.
    pub frames_received: u64,

    /// Individual events dispatched to subscribers.
    pub events_dispatched: u64,

    /// Frames dropped because they could not be parsed.
    pub parse_failures: u64,

    /// Events whose subscribers panicked.
    pub handler_failures: u64,

    /// Sockets opened, including reconnects.
    pub connection_attempts: u64,

    /// Seconds since the current connection opened.
    pub uptime_seconds: u64,
}
