//! Events sent from the host to the UI.

use serde::{Deserialize, Serialize};

use crate::state::{ConnectionSnapshot, HostState, OverlayState};
use crate::types::ConnectionStats;

/// Events that the display host can send to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HostEvent {
    /// Host is ready to accept commands.
    Ready,

    /// Connection status, error message or retry countdown changed.
    ConnectionChanged {
        /// Previous snapshot.
        previous: Box<ConnectionSnapshot>,

        /// Current snapshot.
        current: Box<ConnectionSnapshot>,
    },

    /// Overlay load/mount state changed.
    OverlayChanged(OverlayState),

    /// Periodic connection statistics.
    Stats(ConnectionStats),

    /// Error occurred.
    Error {
        /// Whether the error is recovered without user action.
        recoverable: bool,

        /// Error message.
        message: String,
    },

    /// Reply to [`HostCommand::GetState`](crate::HostCommand::GetState).
    State(HostState),

    /// Host has shut down.
    Shutdown,
}
