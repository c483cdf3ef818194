//! Overlay module loading.
//!
//! This crate provides:
//! - Bundle URL resolution
//! - A pluggable module source with an in-process registry
//! - The loader that verifies the mount export and bridges host events

mod bridge;
mod error;
mod loader;
mod source;

pub use bridge::{subscribe_bridge, BRIDGED_EVENTS};
pub use error::LoaderError;
pub use loader::{LoadedOverlay, OverlayLoader};
pub use source::{resolve_bundle_url, ModuleExports, ModuleSource, OverlayRegistry};

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;
