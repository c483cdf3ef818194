//! Error types for the loader module.

use thiserror::Error;

/// Errors that can occur while loading or mounting an overlay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    /// The module could not be fetched or executed.
    #[error("Failed to load overlay: {url}")]
    Load { url: String, reason: String },

    /// The module loaded but installed no mount function.
    #[error("Overlay did not expose mount function")]
    MissingMount,

    /// Mount was requested before a module was loaded.
    #[error("Overlay not loaded")]
    NotLoaded,
}

impl LoaderError {
    /// Build a load error for `url`.
    pub fn load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
