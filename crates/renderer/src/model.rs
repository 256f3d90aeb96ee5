//! Renderable geometry built from in-memory vertex records.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use tracing::info;

use prism_rhi::buffer::Buffer;
use prism_rhi::command::CommandBuffer;
use prism_rhi::device::Device;
use prism_rhi::vertex::Vertex;
use prism_rhi::{RhiError, RhiResult};

/// A renderable set of vertices with a GPU vertex buffer.
pub struct Model {
    /// Vertex buffer holding the uploaded vertex records.
    vertex_buffer: Buffer,
    /// Number of vertices in the buffer.
    vertex_count: u32,
}

impl Model {
    /// Creates a model from a slice of vertex records.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than three vertices are provided or the
    /// vertex buffer cannot be created.
    pub fn new(device: Arc<Device>, vertices: &[Vertex]) -> RhiResult<Self> {
        if vertices.len() < 3 {
            return Err(RhiError::ResourceCreation(format!(
                "model requires at least 3 vertices, got {}",
                vertices.len()
            )));
        }

        let vertex_buffer = Buffer::new_with_data(
            device,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            MemoryLocation::CpuToGpu,
            bytemuck::cast_slice(vertices),
        )?;

        info!("Model created with {} vertices", vertices.len());

        Ok(Self {
            vertex_buffer,
            vertex_count: vertices.len() as u32,
        })
    }

    /// Binds the model's vertex buffer to the command buffer.
    pub fn bind(&self, cmd: &CommandBuffer) {
        cmd.bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
    }

    /// Issues the draw call for the model's vertices.
    pub fn draw(&self, cmd: &CommandBuffer) {
        cmd.draw(self.vertex_count, 1, 0, 0);
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}
