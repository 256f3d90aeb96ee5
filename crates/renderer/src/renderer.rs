//! Frame driver: swapchain ownership and the per-frame sequence.
//!
//! This module provides the [`Renderer`] struct that owns the presentation
//! resources and drives each frame through acquire → record → submit →
//! present. It is responsible for:
//!
//! - Building the swapchain when the drawable extent becomes valid, and
//!   rebuilding it (with the old chain as resource donor) on resize,
//!   out-of-date, or suboptimal presentation
//! - Keeping the command-buffer pool reconciled with the swapchain image
//!   count, re-recording the buffer for the acquired image every frame
//! - Rebuilding the pipeline whenever the render pass is replaced
//!
//! # Resource Destruction Order
//!
//! Vulkan resources are destroyed in reverse acquisition order:
//! 1. Wait for all GPU work to complete
//! 2. Free command buffers, pipeline, swapchain
//! 3. Destroy pipeline layout, shaders, model
//! 4. Destroy surface, device, instance
//!
//! ManuallyDrop is used to make this order explicit.

use std::mem::ManuallyDrop;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use glam::{Vec2, Vec3};
use tracing::{debug, error, info};

use prism_platform::{Surface, Window};
use prism_rhi::command::{self, CommandBuffer};
use prism_rhi::device::Device;
use prism_rhi::instance::Instance;
use prism_rhi::physical_device::select_physical_device;
use prism_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use prism_rhi::shader::{Shader, ShaderStage};
use prism_rhi::swapchain::Swapchain;
use prism_rhi::vertex::Vertex;
use prism_rhi::{RhiError, RhiResult};

use crate::model::Model;

/// Clear color for the color attachment (dark gray).
const CLEAR_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 1.0];

/// SPIR-V shader locations, relative to the working directory.
const VERTEX_SHADER_PATH: &str = "shaders/triangle.vert.spv";
const FRAGMENT_SHADER_PATH: &str = "shaders/triangle.frag.spv";

/// The rendered geometry: one triangle with a color per corner.
const TRIANGLE: [Vertex; 3] = [
    Vertex::new(Vec2::new(0.0, -0.5), Vec3::new(1.0, 0.0, 0.0)),
    Vertex::new(Vec2::new(0.5, 0.5), Vec3::new(0.0, 1.0, 0.0)),
    Vertex::new(Vec2::new(-0.5, 0.5), Vec3::new(0.0, 0.0, 1.0)),
];

/// Frame driver owning the swapchain, pipeline, and command-buffer pool.
///
/// One instance drives one window. All methods run on the thread that owns
/// the window; nothing here is shared across threads.
pub struct Renderer {
    // Core context (destroyed last, in reverse declaration order via Drop)
    /// Vulkan instance.
    instance: ManuallyDrop<Instance>,
    /// Window surface (destroyed after the swapchain, before the instance).
    surface: ManuallyDrop<Surface>,
    /// Logical device, shared with every owned resource.
    device: ManuallyDrop<Arc<Device>>,

    // Pipeline resources
    /// Shader-visible resource layout (empty: no descriptors, no push
    /// constants). Created once, destroyed exactly once at teardown.
    pipeline_layout: ManuallyDrop<PipelineLayout>,
    /// Vertex shader module, kept alive for pipeline rebuilds.
    vertex_shader: ManuallyDrop<Shader>,
    /// Fragment shader module, kept alive for pipeline rebuilds.
    fragment_shader: ManuallyDrop<Shader>,
    /// Pipeline compiled against the current swapchain's render pass.
    pipeline: Option<Pipeline>,

    // Presentation resources
    /// Current swapchain; absent only during construction and mid-rebuild.
    swapchain: Option<Swapchain>,
    /// One command buffer per swapchain image, indexed by image index.
    command_buffers: Vec<CommandBuffer>,

    // Geometry
    /// The renderable geometry.
    model: ManuallyDrop<Model>,
}

impl Renderer {
    /// Creates a renderer for the given window.
    ///
    /// Builds the Vulkan context, the pipeline layout, the shaders and model,
    /// the initial swapchain, the pipeline, and the command-buffer pool.
    ///
    /// # Errors
    ///
    /// Returns an error if any resource creation fails. A pipeline-layout
    /// failure aborts construction before any model or swapchain work.
    pub fn new(window: &mut Window) -> RhiResult<Self> {
        let extent = window.extent();
        info!(
            "Initializing renderer ({}x{})",
            extent.width, extent.height
        );

        let enable_validation = cfg!(debug_assertions);
        let instance = Instance::new(enable_validation)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::Surface(e.to_string()))?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;

        let device = Device::new(&instance, &physical_device_info)?;

        // Created before any other renderer resource so a failure here aborts
        // construction with nothing else built.
        let pipeline_layout = PipelineLayout::new(device.clone(), &[], &[])?;

        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new(VERTEX_SHADER_PATH),
            ShaderStage::Vertex,
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new(FRAGMENT_SHADER_PATH),
            ShaderStage::Fragment,
        )?;

        let model = Model::new(device.clone(), &TRIANGLE)?;

        let mut renderer = Self {
            instance: ManuallyDrop::new(instance),
            surface: ManuallyDrop::new(surface),
            device: ManuallyDrop::new(device),
            pipeline_layout: ManuallyDrop::new(pipeline_layout),
            vertex_shader: ManuallyDrop::new(vertex_shader),
            fragment_shader: ManuallyDrop::new(fragment_shader),
            pipeline: None,
            swapchain: None,
            command_buffers: Vec::new(),
            model: ManuallyDrop::new(model),
        };

        // Builds the initial swapchain and pipeline, and sizes the
        // command-buffer pool to the image count.
        renderer.recreate_swapchain(window)?;

        let swapchain = renderer
            .swapchain
            .as_ref()
            .expect("swapchain must exist after construction");
        info!(
            "Renderer initialized: {} swapchain images, {} command buffers",
            swapchain.image_count(),
            renderer.command_buffers.len()
        );

        Ok(renderer)
    }

    /// Drives one frame: acquire, record, submit, present.
    ///
    /// An out-of-date surface at acquire time rebuilds the swapchain and ends
    /// the frame early with no submission. After presentation, out-of-date,
    /// suboptimal, or a pending window resize each trigger a rebuild; the
    /// resize flag is consulted after every present regardless of status.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::Presentation`] for non-recoverable acquire or
    /// present failures, and propagates recording and rebuild failures.
    pub fn draw_frame(&mut self, window: &mut Window) -> RhiResult<()> {
        let acquire_result = self
            .swapchain
            .as_mut()
            .expect("swapchain must exist while drawing")
            .acquire_next_image();

        let image_index = match classify_acquire(acquire_result) {
            Ok(Some(index)) => index,
            Ok(None) => {
                debug!("Swapchain out of date during acquire, rebuilding");
                self.recreate_swapchain(window)?;
                return Ok(());
            }
            Err(e) => {
                return Err(RhiError::Presentation(format!(
                    "failed to acquire swapchain image: {e}"
                )));
            }
        };

        self.record_command_buffer(image_index)?;

        let buffer = self.command_buffers[image_index as usize].handle();
        let submit_result = self
            .swapchain
            .as_mut()
            .expect("swapchain must exist while drawing")
            .submit_command_buffers(buffer, image_index);

        match classify_present(submit_result, window.was_resized()) {
            Ok(true) => {
                debug!("Swapchain needs rebuild after present");
                window.reset_resized_flag();
                self.recreate_swapchain(window)?;
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => Err(RhiError::Presentation(format!(
                "failed to present swapchain image: {e}"
            ))),
        }
    }

    /// Rebuilds the swapchain and everything derived from it.
    ///
    /// Blocks on the platform event wait while the drawable extent has a
    /// zero dimension, waits for the device to go idle, constructs the new
    /// swapchain (donating the old one when present), reconciles the
    /// command-buffer pool with the image count, and rebuilds the pipeline
    /// against the new render pass.
    ///
    /// # Errors
    ///
    /// Resource-creation failures propagate; none of them are retried.
    pub fn recreate_swapchain(&mut self, window: &mut Window) -> RhiResult<()> {
        let extent = settle_extent(window.extent(), || {
            window.wait_events();
            window.extent()
        });

        self.device.wait_idle()?;

        let swapchain = match self.swapchain.take() {
            None => Swapchain::new(
                &self.instance,
                Arc::clone(&self.device),
                self.surface.handle(),
                extent,
            )?,
            Some(previous) => Swapchain::from_previous(
                &self.instance,
                Arc::clone(&self.device),
                self.surface.handle(),
                extent,
                previous,
            )?,
        };

        if swapchain.image_count() as usize != self.command_buffers.len() {
            command::free_command_buffers(&self.device, std::mem::take(&mut self.command_buffers));
            self.command_buffers =
                CommandBuffer::allocate(Arc::clone(&self.device), swapchain.image_count())?;
        }

        // TODO: skip this rebuild when the new render pass is compatible with
        // the one the current pipeline was built against.
        self.pipeline = Some(self.build_pipeline(&swapchain)?);
        self.swapchain = Some(swapchain);

        Ok(())
    }

    /// Re-records the command buffer for the given image from scratch.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::CommandRecording`] if any begin/end call fails.
    fn record_command_buffer(&self, image_index: u32) -> RhiResult<()> {
        let swapchain = self
            .swapchain
            .as_ref()
            .expect("swapchain must exist while recording");
        let pipeline = self
            .pipeline
            .as_ref()
            .expect("pipeline must exist while recording");
        let cmd = &self.command_buffers[image_index as usize];

        cmd.reset()?;
        cmd.begin()?;

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: CLEAR_COLOR,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(swapchain.render_pass())
            .framebuffer(swapchain.framebuffer(image_index as usize))
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: swapchain.extent(),
            })
            .clear_values(&clear_values);

        cmd.begin_render_pass(&render_pass_info);

        cmd.set_viewport(&full_viewport(swapchain.extent()));
        cmd.set_scissor(&vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: swapchain.extent(),
        });

        cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline.handle());
        self.model.bind(cmd);
        self.model.draw(cmd);

        cmd.end_render_pass();
        cmd.end()?;

        Ok(())
    }

    /// Compiles the graphics pipeline against the swapchain's render pass.
    fn build_pipeline(&self, swapchain: &Swapchain) -> RhiResult<Pipeline> {
        GraphicsPipelineBuilder::new()
            .vertex_shader(&self.vertex_shader)
            .fragment_shader(&self.fragment_shader)
            .vertex_binding(Vertex::binding_description())
            .vertex_attributes(&Vertex::attribute_descriptions())
            .render_pass(swapchain.render_pass())
            .build(Arc::clone(&self.device), &self.pipeline_layout)
    }

    /// Waits for all GPU work to complete.
    ///
    /// Called once after the run loop exits, before teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails.
    pub fn wait_idle(&self) -> RhiResult<()> {
        self.device.wait_idle()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Wait for all GPU work to complete before destroying resources
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle during renderer drop: {:?}", e);
        }

        command::free_command_buffers(&self.device, std::mem::take(&mut self.command_buffers));
        self.pipeline = None;
        self.swapchain = None;

        // Remaining resources in reverse acquisition order
        unsafe {
            ManuallyDrop::drop(&mut self.pipeline_layout);
            ManuallyDrop::drop(&mut self.vertex_shader);
            ManuallyDrop::drop(&mut self.fragment_shader);
            ManuallyDrop::drop(&mut self.model);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}

/// Interprets an acquire result.
///
/// `Ok(Some(index))` means draw into `index` (a suboptimal acquire still
/// draws), `Ok(None)` means the swapchain must be rebuilt with no drawing
/// this frame, `Err` is a fatal status.
fn classify_acquire(result: Result<(u32, bool), vk::Result>) -> Result<Option<u32>, vk::Result> {
    match result {
        Ok((index, _suboptimal)) => Ok(Some(index)),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Interprets a submit/present result together with the window resize flag.
///
/// `Ok(true)` means the swapchain must be rebuilt; the resize flag alone is
/// enough even when presentation succeeded. `Err` is a fatal status.
fn classify_present(
    result: Result<bool, vk::Result>,
    window_resized: bool,
) -> Result<bool, vk::Result> {
    match result {
        Ok(suboptimal) => Ok(suboptimal || window_resized),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
        Err(e) => Err(e),
    }
}

/// Blocks (via `wait_and_read`) until the extent has no zero dimension.
///
/// Models a minimized or mid-resize window: each iteration performs one
/// blocking event wait and re-reads the extent, so a surface that becomes
/// valid after one wait causes exactly one wait.
fn settle_extent(
    mut extent: vk::Extent2D,
    mut wait_and_read: impl FnMut() -> vk::Extent2D,
) -> vk::Extent2D {
    while extent.width == 0 || extent.height == 0 {
        extent = wait_and_read();
    }
    extent
}

/// Full-extent viewport with the standard 0..1 depth range.
fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_success_draws() {
        assert_eq!(classify_acquire(Ok((3, false))), Ok(Some(3)));
    }

    #[test]
    fn test_acquire_suboptimal_still_draws() {
        assert_eq!(classify_acquire(Ok((0, true))), Ok(Some(0)));
    }

    #[test]
    fn test_acquire_out_of_date_rebuilds_without_drawing() {
        assert_eq!(
            classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)),
            Ok(None)
        );
    }

    #[test]
    fn test_acquire_other_failure_is_fatal() {
        assert_eq!(
            classify_acquire(Err(vk::Result::ERROR_DEVICE_LOST)),
            Err(vk::Result::ERROR_DEVICE_LOST)
        );
    }

    #[test]
    fn test_present_success_without_resize_keeps_swapchain() {
        assert_eq!(classify_present(Ok(false), false), Ok(false));
    }

    #[test]
    fn test_present_rebuild_triggers_are_equivalent() {
        // Each condition independently triggers exactly one rebuild
        assert_eq!(classify_present(Ok(true), false), Ok(true));
        assert_eq!(
            classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR), false),
            Ok(true)
        );
        assert_eq!(classify_present(Ok(false), true), Ok(true));
    }

    #[test]
    fn test_present_other_failure_is_fatal() {
        assert_eq!(
            classify_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR), false),
            Err(vk::Result::ERROR_SURFACE_LOST_KHR)
        );
    }

    #[test]
    fn test_settle_extent_returns_immediately_when_valid() {
        let mut waits = 0;
        let extent = settle_extent(
            vk::Extent2D {
                width: 800,
                height: 600,
            },
            || {
                waits += 1;
                vk::Extent2D {
                    width: 800,
                    height: 600,
                }
            },
        );
        assert_eq!(waits, 0);
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn test_settle_extent_waits_exactly_once() {
        // Surface reports (0,0), then (800,600) after one blocking wait
        let mut waits = 0;
        let extent = settle_extent(
            vk::Extent2D {
                width: 0,
                height: 0,
            },
            || {
                waits += 1;
                vk::Extent2D {
                    width: 800,
                    height: 600,
                }
            },
        );
        assert_eq!(waits, 1);
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn test_settle_extent_waits_while_either_dimension_is_zero() {
        let mut waits = 0;
        let extent = settle_extent(
            vk::Extent2D {
                width: 1024,
                height: 0,
            },
            || {
                waits += 1;
                if waits < 3 {
                    vk::Extent2D {
                        width: 0,
                        height: 768,
                    }
                } else {
                    vk::Extent2D {
                        width: 1024,
                        height: 768,
                    }
                }
            },
        );
        assert_eq!(waits, 3);
        assert_eq!((extent.width, extent.height), (1024, 768));
    }

    #[test]
    fn test_full_viewport_covers_extent() {
        let viewport = full_viewport(vk::Extent2D {
            width: 1280,
            height: 720,
        });
        assert_eq!(viewport.x, 0.0);
        assert_eq!(viewport.y, 0.0);
        assert_eq!(viewport.width, 1280.0);
        assert_eq!(viewport.height, 720.0);
        assert_eq!(viewport.min_depth, 0.0);
        assert_eq!(viewport.max_depth, 1.0);
    }
}
