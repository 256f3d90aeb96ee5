//! Platform abstraction layer for the prism renderer.
//!
//! This crate provides platform-specific functionality:
//! - Window management via winit
//! - Blocking and non-blocking event pumping
//! - Raw window handles for Vulkan surface creation

mod window;

pub use window::{Surface, Window};
