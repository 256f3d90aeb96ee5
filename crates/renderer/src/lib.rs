//! Frame orchestration for the prism renderer.
//!
//! This crate drives the per-frame sequence:
//! - Swapchain image acquisition, submission, and presentation
//! - Command buffer re-recording
//! - Swapchain and pipeline recreation when the surface changes

pub mod model;
pub mod renderer;

pub use model::Model;
pub use renderer::Renderer;
