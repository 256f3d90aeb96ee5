//! GPU buffer management.
//!
//! This module handles buffer creation and data upload. Memory is managed by
//! gpu-allocator, which handles suballocation and memory type selection.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use prism_rhi::buffer::Buffer;
//! use prism_rhi::device::Device;
//! use ash::vk;
//! use gpu_allocator::MemoryLocation;
//!
//! # fn example(device: Arc<Device>) -> Result<(), prism_rhi::RhiError> {
//! let vertices: [f32; 6] = [0.0, 0.5, -0.5, -0.5, 0.5, -0.5];
//! let vertex_buffer = Buffer::new_with_data(
//!     device,
//!     vk::BufferUsageFlags::VERTEX_BUFFER,
//!     MemoryLocation::CpuToGpu,
//!     bytemuck::cast_slice(&vertices),
//! )?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// GPU buffer wrapper with managed memory.
///
/// This struct wraps a Vulkan buffer and its associated memory allocation.
///
/// # Thread Safety
///
/// The buffer itself is not thread-safe. Synchronize access externally when
/// sharing between threads.
pub struct Buffer {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan buffer handle.
    buffer: vk::Buffer,
    /// GPU memory allocation, taken back out on drop.
    allocation: Option<Allocation>,
    /// Buffer size in bytes.
    size: vk::DeviceSize,
}

impl Buffer {
    /// Creates a new buffer with the specified size.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `usage` - Vulkan buffer usage flags
    /// * `location` - Preferred memory location
    /// * `size` - Buffer size in bytes
    ///
    /// # Errors
    ///
    /// Returns an error if buffer or memory allocation fails, or if `size`
    /// is zero.
    pub fn new(
        device: Arc<Device>,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        size: vk::DeviceSize,
    ) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::ResourceCreation(
                "buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };

        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        // Allocate memory
        let allocation = {
            let mut allocator = device
                .allocator()
                .lock()
                .expect("allocator mutex poisoned");
            allocator.allocate(&AllocationCreateDesc {
                name: "buffer",
                requirements,
                location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?
        };

        // Bind memory to buffer
        unsafe {
            device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())?;
        }

        debug!("Created buffer: {} bytes", size);

        Ok(Self {
            device,
            buffer,
            allocation: Some(allocation),
            size,
        })
    }

    /// Creates a new buffer and initializes it with data.
    ///
    /// The memory location must be CPU-visible.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer creation or data upload fails.
    pub fn new_with_data(
        device: Arc<Device>,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        data: &[u8],
    ) -> RhiResult<Self> {
        let buffer = Self::new(device, usage, location, data.len() as vk::DeviceSize)?;
        buffer.upload(data)?;
        Ok(buffer)
    }

    /// Uploads data to the buffer through its CPU mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer memory is not host-visible or the data
    /// does not fit.
    pub fn upload(&self, data: &[u8]) -> RhiResult<()> {
        if data.len() as vk::DeviceSize > self.size {
            return Err(RhiError::ResourceCreation(format!(
                "upload of {} bytes exceeds buffer size {}",
                data.len(),
                self.size
            )));
        }

        let allocation = self
            .allocation
            .as_ref()
            .expect("buffer allocation missing before drop");

        let mapped = allocation.mapped_ptr().ok_or_else(|| {
            RhiError::ResourceCreation("buffer memory is not host-visible".to_string())
        })?;

        // SAFETY: the mapping is valid for the allocation's lifetime and the
        // bounds check above guarantees the copy stays inside the buffer.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.as_ptr().cast::<u8>(), data.len());
        }

        Ok(())
    }

    /// Returns the Vulkan buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Returns the buffer size in bytes.
    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            let mut allocator = self
                .device
                .allocator()
                .lock()
                .expect("allocator mutex poisoned");
            if let Err(e) = allocator.free(allocation) {
                tracing::error!("Failed to free buffer memory: {:?}", e);
            }
        }

        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }
        debug!("Buffer destroyed");
    }
}
