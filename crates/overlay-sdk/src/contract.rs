//! Narrow contract between a display host and an overlay.
//!
//! This is the only interface that crosses the isolation boundary: the host
//! hands over plain JSON configuration and a subscription function, and gets
//! back a handle for lifecycle control. The overlay never sees the host's
//! emitter or socket.

use std::sync::Arc;

use serde_json::Value;

use overlay_ipc::OverlayConfig;

/// Callback receiving `(event_name, data)` for every bridged event.
pub type EventCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Removes a subscription made through [`MountProps::subscribe_to_events`].
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// Subscribe to host events. Returns the matching unsubscribe function.
pub type SubscribeFn = Box<dyn Fn(EventCallback) -> Unsubscribe + Send + Sync>;

/// The mount function exposed by an overlay module.
pub type MountFn = Arc<dyn Fn(Arc<dyn Surface>, MountProps) -> Box<dyn OverlayHandle> + Send + Sync>;

/// Container an overlay draws into.
pub trait Surface: Send + Sync {
    /// Replace the visible content with a newly rendered frame.
    fn present(&self, frame: &str);

    /// Remove all content.
    fn clear(&self);
}

/// Props passed to an overlay's mount function.
pub struct MountProps {
    /// Configuration object (plain JSON).
    pub config: OverlayConfig,

    /// Subscribe to host events.
    pub subscribe_to_events: SubscribeFn,
}

/// Handle returned by mount for lifecycle control.
pub trait OverlayHandle: Send {
    /// Unmount the overlay and clean up. Calls after the first are no-ops.
    fn unmount(&mut self);

    /// Update configuration at runtime, without remounting.
    fn update_config(&mut self, config: OverlayConfig);
}
