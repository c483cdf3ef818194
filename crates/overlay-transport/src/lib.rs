//! Live event stream transport.
//!
//! This crate provides:
//! - Frame parsing for batched event bundles
//! - A sans-IO connection state machine with retry countdown
//! - A WebSocket client that drives the machine on its own thread

pub mod bundle;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod machine;
pub mod websocket;

pub use bundle::{decode_frame, parse_bundle, ClientMessage, ClientMessageBundle};
pub use connection::{CloseKind, RetryPolicy, ABNORMAL_CLOSURE, INVALID_AUTH, NOT_LIVE, NO_STATUS};
pub use endpoint::build_websocket_url;
pub use error::{ConnectionError, TransportError};
pub use machine::{ConnectionAction, ConnectionMachine, SocketId, TransportStatistics};
pub use websocket::{ConnectionEvent, WebcastClient};

pub use overlay_ipc::DEFAULT_RETRY_INTERVAL_SECS;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
