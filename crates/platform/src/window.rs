//! Window management using winit.
//!
//! This module provides window creation, event pumping, and Vulkan surface
//! creation. The event loop is pumped synchronously from the caller's frame
//! loop: [`Window::poll_events`] drains pending events without blocking and
//! [`Window::wait_events`] parks the thread until the platform delivers the
//! next event (used while the drawable area is zero-sized).

use std::sync::Arc;
use std::time::Duration;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::EventLoopExtPumpEvents;
use winit::window::{Window as WinitWindow, WindowAttributes, WindowId};

use prism_core::{Error, Result};

/// RAII wrapper for a Vulkan surface.
///
/// This struct owns a `vk::SurfaceKHR` handle and ensures it is properly
/// destroyed when dropped. The surface loader is stored internally to perform
/// cleanup.
///
/// # Ownership
/// The surface is destroyed automatically when this struct is dropped.
/// The caller must ensure that the Vulkan instance outlives this surface.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Get the raw Vulkan surface handle.
    ///
    /// # Note
    /// The returned handle is valid only as long as this `Surface` instance
    /// exists. Do not store this handle beyond the lifetime of the `Surface`.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Get a reference to the surface loader.
    ///
    /// This is useful for querying surface capabilities, formats, and
    /// present modes.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: The surface handle is valid and was created by
        // ash_window::create_surface. The surface loader was created from the
        // same instance. This is the only place where the surface is destroyed.
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        tracing::debug!("Vulkan surface destroyed");
    }
}

/// Event-loop state driven by the pumped winit loop.
///
/// Records the window handle once the platform delivers `resumed`, and the
/// resize/close signals the frame loop consumes between pumps.
struct WindowState {
    window: Option<Arc<WinitWindow>>,
    title: String,
    width: u32,
    height: u32,
    resized: bool,
    close_requested: bool,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(PhysicalSize::new(self.width, self.height))
            .with_resizable(true);

        match event_loop.create_window(attrs) {
            Ok(window) => {
                tracing::info!("Window created: {}x{}", self.width, self.height);
                self.window = Some(Arc::new(window));
            }
            Err(e) => {
                tracing::error!("Failed to create window: {}", e);
                self.close_requested = true;
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                tracing::debug!("Window resized: {}x{}", size.width, size.height);
                self.width = size.width;
                self.height = size.height;
                self.resized = true;
            }
            _ => {}
        }
    }
}

/// A window wrapper that owns the winit event loop and exposes the
/// synchronous contract the frame loop needs: current extent, close and
/// resize signals, and poll/wait event pumping.
pub struct Window {
    event_loop: EventLoop<()>,
    state: WindowState,
}

impl Window {
    /// Create a new window with the given dimensions and title.
    ///
    /// This pumps the event loop until the platform has delivered the
    /// `resumed` event and the native window exists.
    ///
    /// # Errors
    /// Returns an error if the event loop or the native window cannot be
    /// created.
    pub fn new(width: u32, height: u32, title: &str) -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| Error::Window(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let state = WindowState {
            window: None,
            title: title.to_string(),
            width,
            height,
            resized: false,
            close_requested: false,
        };

        let mut window = Self { event_loop, state };

        while window.state.window.is_none() {
            if window.state.close_requested {
                return Err(Error::Window("window creation failed".to_string()));
            }
            let _ = window
                .event_loop
                .pump_app_events(Some(Duration::from_millis(10)), &mut window.state);
        }

        Ok(window)
    }

    /// Process all pending window events without blocking.
    pub fn poll_events(&mut self) {
        let _ = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state);
    }

    /// Block until the platform delivers at least one event, then process it.
    ///
    /// Used while the drawable area is zero-sized (minimized or mid-resize)
    /// so the loop does not spin the CPU.
    pub fn wait_events(&mut self) {
        let _ = self.event_loop.pump_app_events(None, &mut self.state);
    }

    /// Whether the user has requested the window to close.
    #[inline]
    pub fn should_close(&self) -> bool {
        self.state.close_requested
    }

    /// Whether a resize has been observed since the flag was last reset.
    #[inline]
    pub fn was_resized(&self) -> bool {
        self.state.resized
    }

    /// Clear the resize flag.
    #[inline]
    pub fn reset_resized_flag(&mut self) {
        self.state.resized = false;
    }

    /// Get the current drawable extent in pixels.
    ///
    /// Either dimension may be zero while the window is minimized or mid
    /// resize; callers must not build a swapchain from a zero extent.
    pub fn extent(&self) -> vk::Extent2D {
        match &self.state.window {
            Some(window) => {
                let size = window.inner_size();
                vk::Extent2D {
                    width: size.width,
                    height: size.height,
                }
            }
            None => vk::Extent2D {
                width: self.state.width,
                height: self.state.height,
            },
        }
    }

    /// Get the aspect ratio of the window.
    pub fn aspect_ratio(&self) -> f32 {
        let extent = self.extent();
        extent.width as f32 / extent.height.max(1) as f32
    }

    /// Create a Vulkan surface for this window.
    ///
    /// Returns a RAII [`Surface`] wrapper that automatically destroys the
    /// surface when dropped.
    ///
    /// # Arguments
    /// * `entry` - The Vulkan entry point
    /// * `instance` - The Vulkan instance (must outlive the returned `Surface`)
    ///
    /// # Errors
    /// Returns an error if surface creation fails due to:
    /// - Invalid window or display handles
    /// - Vulkan surface creation failure
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let window = self
            .state
            .window
            .as_ref()
            .ok_or_else(|| Error::Window("native window not created yet".to_string()))?;

        let display_handle = window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

        let window_handle = window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;

        // SAFETY: The entry and instance are valid references provided by the
        // caller. The display and window handles are valid as they come from
        // the winit window. The surface is destroyed in Surface::drop.
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Vulkan(format!("Failed to create Vulkan surface: {}", e)))?
        };

        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        tracing::info!("Vulkan surface created successfully");

        Ok(Surface {
            handle,
            surface_loader,
        })
    }
}
