//! Error types for the SDK.

use thiserror::Error;

/// Errors that can occur while reading overlay metadata.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Manifest document could not be decoded.
    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
