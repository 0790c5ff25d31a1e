/// GeometryBuffer - CPU vertex array shadowed into a device vertex buffer
///
/// Follows the device-synced resource contract: the host copy and the
/// device copy are reconciled by `update_device`, which reallocates only
/// when the required size changed (or nothing was allocated yet) and
/// otherwise rewrites the mapped region in place. Uploaded once at startup
/// in this demo and referenced read-only afterwards unless the vertices
/// change.

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::prism3d::render::DeviceSyncState;
use prism_3d_engine::{engine_debug, engine_error, engine_err};
use ash::vk;
use bytemuck::Pod;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vertex buffer with a host-side shadow copy
pub struct GeometryBuffer<V: Pod> {
    vertices: Vec<V>,
    sync_state: DeviceSyncState,
    uploaded_vertex_count: usize,

    ctx: Option<Arc<GpuContext>>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    current_buffer_size: u64,
}

impl<V: Pod> GeometryBuffer<V> {
    /// Create from host vertices; no device work happens until
    /// `update_device`
    pub fn new(vertices: Vec<V>) -> Self {
        Self {
            vertices,
            sync_state: DeviceSyncState::Empty,
            uploaded_vertex_count: 0,
            ctx: None,
            buffer: vk::Buffer::null(),
            allocation: None,
            current_buffer_size: 0,
        }
    }

    pub fn sync_state(&self) -> DeviceSyncState {
        self.sync_state
    }

    /// Number of vertices the device copy holds (the host copy may have
    /// been flushed)
    pub fn vertex_count(&self) -> usize {
        match self.sync_state {
            DeviceSyncState::CpuDataFlushed | DeviceSyncState::InSync => self.uploaded_vertex_count,
            _ => self.vertices.len(),
        }
    }

    pub fn buffer(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    /// Mutable access to the host copy; marks the device copy stale
    pub fn vertices_mut(&mut self) -> &mut Vec<V> {
        if self.sync_state == DeviceSyncState::InSync {
            self.sync_state = DeviceSyncState::OutOfSync;
        }
        &mut self.vertices
    }

    /// Replace the host copy; marks the device copy stale
    pub fn set_vertices(&mut self, vertices: Vec<V>) {
        self.vertices = vertices;
        if self.sync_state != DeviceSyncState::Empty {
            self.sync_state = DeviceSyncState::OutOfSync;
        }
    }

    /// Drop the host copy while keeping the device copy valid.
    ///
    /// After a flush no CPU-driven re-upload can happen until fresh data
    /// is supplied with `set_vertices`.
    pub fn flush_cpu_data(&mut self) {
        self.vertices.clear();
        self.sync_state = self.sync_state.after_cpu_flush();
    }

    /// Reconcile the device copy with the host copy.
    ///
    /// Supplying a different context than the one currently bound frees
    /// all existing device allocations first; device resources are never
    /// reused across contexts. With no context available at all this is a
    /// fatal configuration error.
    pub fn update_device(&mut self, ctx: Option<Arc<GpuContext>>) -> Result<()> {
        if let Some(new_ctx) = ctx {
            let switching = self
                .ctx
                .as_ref()
                .map(|current| !Arc::ptr_eq(current, &new_ctx))
                .unwrap_or(false);
            if switching {
                self.free_device_resources();
            }
            if self.ctx.is_none() || switching {
                self.ctx = Some(new_ctx);
            }
        }

        let Some(ctx) = self.ctx.clone() else {
            engine_error!("prism3d::vulkan", "updateDevice on a vertex buffer with no associated device");
            return Err(Error::Configuration(
                "Vertex buffer has no associated device context".to_string(),
            ));
        };

        if !self.sync_state.needs_upload() {
            return Ok(());
        }

        let required_size = (std::mem::size_of::<V>() * self.vertices.len()) as u64;
        if required_size == 0 {
            engine_error!("prism3d::vulkan", "Vertex buffer upload attempted with no vertex data");
            return Err(Error::Configuration(
                "Vertex buffer upload attempted with no vertex data".to_string(),
            ));
        }

        // Reallocate only when the size changed or nothing exists yet
        if self.sync_state == DeviceSyncState::Empty || required_size != self.current_buffer_size {
            self.release_buffer();
            self.allocate_buffer(&ctx, required_size)?;
        }

        self.write_vertices()?;
        self.uploaded_vertex_count = self.vertices.len();
        self.sync_state = DeviceSyncState::InSync;
        Ok(())
    }

    /// Release device buffer and memory and reset to `Empty`.
    ///
    /// Also runs automatically on drop; calling it earlier is safe and
    /// idempotent.
    pub fn free_device_resources(&mut self) {
        self.release_buffer();
        self.sync_state = DeviceSyncState::Empty;
        self.uploaded_vertex_count = 0;
    }

    fn allocate_buffer(&mut self, ctx: &Arc<GpuContext>, size: u64) -> Result<()> {
        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(vk::BufferUsageFlags::VERTEX_BUFFER)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&buffer_info, None)
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to create vertex buffer: {:?}", e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = {
                let mut allocator = ctx.allocator.lock().map_err(|_| {
                    engine_err!("prism3d::vulkan", "GPU allocator lock poisoned")
                })?;
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: "vertex buffer",
                        requirements,
                        location: MemoryLocation::CpuToGpu,
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|e| {
                        engine_error!("prism3d::vulkan", "Failed to allocate vertex buffer memory: {:?}", e);
                        Error::OutOfMemory
                    })?
            };

            ctx.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to bind vertex buffer memory: {:?}", e))?;

            self.buffer = buffer;
            self.allocation = Some(allocation);
            self.current_buffer_size = size;
            engine_debug!("prism3d::vulkan", "Vertex buffer allocated: {} bytes", size);
            Ok(())
        }
    }

    fn write_vertices(&mut self) -> Result<()> {
        let Some(allocation) = self.allocation.as_ref() else {
            engine_error!("prism3d::vulkan", "Vertex upload without a backing allocation");
            return Err(Error::InvalidResource(
                "Vertex upload without a backing allocation".to_string(),
            ));
        };
        let mapped = allocation.mapped_ptr().ok_or_else(|| {
            engine_err!("prism3d::vulkan", "Vertex buffer memory is not CPU-accessible")
        })?;

        let bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped.as_ptr() as *mut u8, bytes.len());
        }
        Ok(())
    }

    fn release_buffer(&mut self) {
        let Some(ctx) = self.ctx.as_ref() else {
            return;
        };
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            if self.buffer != vk::Buffer::null() {
                ctx.device.destroy_buffer(self.buffer, None);
                self.buffer = vk::Buffer::null();
            }
        }
        self.current_buffer_size = 0;
    }
}

impl<V: Pod> Drop for GeometryBuffer<V> {
    fn drop(&mut self) {
        self.release_buffer();
    }
}
