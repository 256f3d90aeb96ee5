//! Command buffer allocation and recording.
//!
//! This module wraps VkCommandBuffer with the recording operations the frame
//! loop needs. Buffers are allocated from the device's command pool, one per
//! swapchain image, and re-recorded from scratch every frame.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use prism_rhi::device::Device;
//! use prism_rhi::command::CommandBuffer;
//!
//! # fn example(device: Arc<Device>) -> Result<(), prism_rhi::RhiError> {
//! // One command buffer per swapchain image
//! let buffers = CommandBuffer::allocate(device, 3)?;
//!
//! for cmd in &buffers {
//!     cmd.begin()?;
//!     // ... record rendering commands ...
//!     cmd.end()?;
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Vulkan command buffer wrapper.
///
/// Provides a safe interface for recording Vulkan commands. Commands are
/// recorded between [`begin`](Self::begin) and [`end`](Self::end) calls.
///
/// # Note
///
/// The wrapper does NOT free the underlying VkCommandBuffer on drop. Buffers
/// are returned to the pool explicitly via [`free_command_buffers`], or
/// implicitly when the owning command pool is destroyed.
pub struct CommandBuffer {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan command buffer handle.
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    /// Allocates `count` primary command buffers from the device's command
    /// pool.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::ResourceCreation`] if allocation fails.
    pub fn allocate(device: Arc<Device>, count: u32) -> RhiResult<Vec<CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(device.command_pool())
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = unsafe {
            device
                .handle()
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| RhiError::ResourceCreation(format!("command buffers: {e}")))?
        };

        info!("Allocated {} command buffer(s)", count);

        Ok(buffers
            .into_iter()
            .map(|buffer| CommandBuffer {
                device: device.clone(),
                buffer,
            })
            .collect())
    }

    /// Returns the raw Vulkan command buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    /// Begins recording commands that can be resubmitted.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::CommandRecording`] if beginning fails (e.g., if
    /// already recording).
    pub fn begin(&self) -> RhiResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default();

        unsafe {
            self.device
                .handle()
                .begin_command_buffer(self.buffer, &begin_info)
                .map_err(|e| {
                    RhiError::CommandRecording(format!("failed to begin command buffer: {e}"))
                })?;
        }

        Ok(())
    }

    /// Ends recording commands to the buffer.
    ///
    /// After this call, the command buffer is ready for submission.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::CommandRecording`] if ending fails.
    pub fn end(&self) -> RhiResult<()> {
        unsafe {
            self.device
                .handle()
                .end_command_buffer(self.buffer)
                .map_err(|e| {
                    RhiError::CommandRecording(format!("failed to end command buffer: {e}"))
                })?;
        }

        Ok(())
    }

    /// Resets the command buffer to its initial state.
    ///
    /// This allows the buffer to be re-recorded without reallocating.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::CommandRecording`] if the reset fails.
    pub fn reset(&self) -> RhiResult<()> {
        unsafe {
            self.device
                .handle()
                .reset_command_buffer(self.buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| {
                    RhiError::CommandRecording(format!("failed to reset command buffer: {e}"))
                })?;
        }

        Ok(())
    }

    /// Begins a render pass with inline subpass contents.
    pub fn begin_render_pass(&self, begin_info: &vk::RenderPassBeginInfo) {
        unsafe {
            self.device.handle().cmd_begin_render_pass(
                self.buffer,
                begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    /// Ends the current render pass.
    pub fn end_render_pass(&self) {
        unsafe {
            self.device.handle().cmd_end_render_pass(self.buffer);
        }
    }

    /// Binds a pipeline to the command buffer.
    pub fn bind_pipeline(&self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_pipeline(self.buffer, bind_point, pipeline);
        }
    }

    /// Binds vertex buffers to the command buffer.
    pub fn bind_vertex_buffers(
        &self,
        first_binding: u32,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        unsafe {
            self.device.handle().cmd_bind_vertex_buffers(
                self.buffer,
                first_binding,
                buffers,
                offsets,
            );
        }
    }

    /// Sets the viewport dynamically.
    pub fn set_viewport(&self, viewport: &vk::Viewport) {
        unsafe {
            self.device
                .handle()
                .cmd_set_viewport(self.buffer, 0, std::slice::from_ref(viewport));
        }
    }

    /// Sets the scissor rectangle dynamically.
    pub fn set_scissor(&self, scissor: &vk::Rect2D) {
        unsafe {
            self.device
                .handle()
                .cmd_set_scissor(self.buffer, 0, std::slice::from_ref(scissor));
        }
    }

    /// Issues a non-indexed draw command.
    pub fn draw(
        &self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.handle().cmd_draw(
                self.buffer,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }
}

/// Returns a set of command buffers to the device's command pool.
///
/// The buffers must not be pending execution; callers synchronize with a
/// device-idle wait before freeing.
pub fn free_command_buffers(device: &Device, buffers: Vec<CommandBuffer>) {
    if buffers.is_empty() {
        return;
    }

    let handles: Vec<vk::CommandBuffer> = buffers.iter().map(|b| b.buffer).collect();

    unsafe {
        device
            .handle()
            .free_command_buffers(device.command_pool(), &handles);
    }

    debug!("Freed {} command buffer(s)", handles.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_buffer_is_send() {
        // Compile-time check that CommandBuffer is Send
        fn assert_send<T: Send>() {}
        assert_send::<CommandBuffer>();
    }
}
