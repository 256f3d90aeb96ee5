//! Error types for the platform layer.

use thiserror::Error;

/// Error type for window and platform failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// Vulkan surface errors raised at the platform boundary
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the platform Error type.
pub type Result<T> = std::result::Result<T, Error>;
