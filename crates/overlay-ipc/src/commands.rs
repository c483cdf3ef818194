//! Commands sent from the UI to the host.

use serde::{Deserialize, Serialize};

use crate::types::{DisplayConfig, OverlayConfig};

/// Commands that the UI can send to the display host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HostCommand {
    /// Connect to the event stream and display the configured overlay.
    Start { config: DisplayConfig },

    /// Reconnect immediately, cancelling any pending retry countdown.
    Retry,

    /// Replace the stored overlay configuration overrides.
    UpdateConfig(OverlayConfig),

    /// Request current host state.
    GetState,

    /// Tear down the connection and unmount the overlay.
    Stop,

    /// Shutdown the host completely.
    Shutdown,
}
