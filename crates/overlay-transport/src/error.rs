//! Error types for the transport module.

use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Invalid endpoint URL.
    #[error("Invalid WebSocket URL: {0}")]
    InvalidUrl(String),

    /// Streamer id or key missing.
    #[error("Missing credentials: unique id and JWT key are required")]
    MissingCredentials,

    /// Frame payload could not be decoded.
    #[error("Failed to parse message: {0}")]
    Parse(#[from] serde_json::Error),

    /// Binary frame was not valid UTF-8.
    #[error("Failed to decode frame: {0}")]
    Decode(#[from] std::str::Utf8Error),

    /// Client has not been started.
    #[error("Not started")]
    NotStarted,

    /// Channel disconnected.
    #[error("Channel disconnected")]
    ChannelDisconnected,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why the live connection is down.
///
/// The `Display` text is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The target stream is not live.
    #[error("Stream is offline")]
    Offline,

    /// The server rejected the credentials.
    #[error("Invalid API key")]
    Unauthorized,

    /// Any other close code.
    #[error("Connection closed: {code}")]
    Transient { code: u16 },

    /// Socket error before a close code was known.
    #[error("Connection error")]
    Socket,
}
