//! Display host for overlays.
//!
//! This crate keeps the live event stream connected, loads the configured
//! overlay once and mounts it whenever the connection is up.

mod error;
mod host;
mod metrics;
mod state;

pub use error::EngineError;
pub use host::DisplayHost;
pub use metrics::{StatsReporter, STATS_INTERVAL};
pub use state::OverlaySession;

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use overlay_ipc::{HostCommand, HostEvent};
use overlay_loader::ModuleSource;
use overlay_sdk::Surface;

/// Create a display host wired to IPC channels.
pub fn create_host(
    command_rx: Receiver<HostCommand>,
    event_tx: Sender<HostEvent>,
    source: Arc<dyn ModuleSource>,
    surface: Arc<dyn Surface>,
) -> DisplayHost {
    DisplayHost::new(command_rx, event_tx, source, surface)
}
