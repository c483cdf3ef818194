//! Error types for the display host.

use thiserror::Error;

use overlay_loader::LoaderError;
use overlay_transport::TransportError;

/// Errors surfaced by the display host.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Connection could not be set up.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Overlay could not be loaded or mounted.
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// No overlay bundle configured.
    #[error("No overlay bundle configured")]
    NoBundle,

    /// Command requires a started host.
    #[error("Display host not started")]
    NotStarted,
}
