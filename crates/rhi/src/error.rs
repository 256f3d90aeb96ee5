//! RHI-specific error types.

use thiserror::Error;

/// RHI-specific error type.
///
/// The recoverable presentation statuses (`ERROR_OUT_OF_DATE_KHR`, and
/// `SUBOPTIMAL_KHR` combined with a pending resize) are not errors; they are
/// handled by the swapchain recreation path before anything is converted into
/// this type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] ash::vk::Result),

    /// Failed to load Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// Surface creation or query error
    #[error("Surface error: {0}")]
    Surface(String),

    /// Shader loading or module creation error
    #[error("Shader error: {0}")]
    Shader(String),

    /// Pipeline layout, swapchain, or command-buffer allocation failure
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),

    /// Command buffer begin/end failure
    #[error("Command recording failed: {0}")]
    CommandRecording(String),

    /// Acquire/submit/present failure that is not recoverable by recreation
    #[error("Presentation failed: {0}")]
    Presentation(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
