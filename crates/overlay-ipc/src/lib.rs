//! Typed host<->UI messages for the overlay display.
//!
//! This crate defines the message and state types shared between the
//! display host engine, the connection transport and whatever front end
//! presents connection status to the user.

mod commands;
mod events;
mod state;
mod types;

pub use commands::HostCommand;
pub use events::HostEvent;
pub use state::{ConnectionSnapshot, ConnectionStatus, HostState, OverlayState, RetryState};
pub use types::{
    ConnectionConfig, ConnectionStats, DisplayConfig, OverlayConfig, DEFAULT_ENDPOINT,
    DEFAULT_RETRY_INTERVAL_SECS,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (UI → Host).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (Host → UI).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<HostCommand>, Receiver<HostCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<HostEvent>, Receiver<HostEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
