//! Overlay authoring runtime.
//!
//! This crate provides the pieces shared by display hosts and overlays:
//! an event emitter, the narrow mount contract that crosses the isolation
//! boundary, a runtime that turns a component into a mount function, and
//! the manifest types used to derive default configuration.

mod contract;
mod emitter;
mod error;
mod manifest;
mod mount;

pub use contract::{
    EventCallback, MountFn, MountProps, OverlayHandle, SubscribeFn, Surface, Unsubscribe,
};
pub use emitter::{EventEmitter, EventHandler, SubscriptionId};
pub use error::SdkError;
pub use manifest::{
    default_config, merge_with_defaults, ConfigGroup, ConfigOption, ConfigOptionType,
    OverlayManifest,
};
pub use mount::{create_mount, OverlayComponent, OverlayMount, RenderContext};
pub use overlay_ipc::OverlayConfig;

/// Result type for SDK operations.
pub type SdkResult<T> = Result<T, SdkError>;
