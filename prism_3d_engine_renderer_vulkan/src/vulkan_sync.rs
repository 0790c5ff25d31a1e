/// Frame synchronization primitives
///
/// One `FrameSync` triple per in-flight slot: the image-available
/// semaphore gates GPU work on image acquisition, the render-finished
/// semaphore gates presentation on GPU work, and the fence lets the CPU
/// wait for the slot's previous use to drain before reusing any of it.
/// Fences are created signaled so the first wait on each slot passes
/// immediately.

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::engine_error;
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;


/// Sync-object slot for a frame number under a fixed in-flight limit
pub(crate) fn in_flight_slot(frame_number: u64, in_flight_limit: usize) -> usize {
    (frame_number % in_flight_limit as u64) as usize
}

/// Synchronization triple for one in-flight frame slot
pub struct FrameSync {
    ctx: Arc<GpuContext>,
    pub(crate) image_available: vk::Semaphore,
    pub(crate) render_finished: vk::Semaphore,
    pub(crate) in_flight: vk::Fence,
}

impl FrameSync {
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let semaphore_info = vk::SemaphoreCreateInfo::default();
            let fence_info =
                vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

            let image_available = ctx
                .device
                .create_semaphore(&semaphore_info, None)
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to create image-available semaphore: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                })?;
            let render_finished = ctx
                .device
                .create_semaphore(&semaphore_info, None)
                .map_err(|e| {
                    unsafe {
                        ctx.device.destroy_semaphore(image_available, None);
                    }
                    engine_error!("prism3d::vulkan", "Failed to create render-finished semaphore: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create semaphore: {:?}", e))
                })?;
            let in_flight = ctx.device.create_fence(&fence_info, None).map_err(|e| {
                unsafe {
                    ctx.device.destroy_semaphore(image_available, None);
                    ctx.device.destroy_semaphore(render_finished, None);
                }
                engine_error!("prism3d::vulkan", "Failed to create in-flight fence: {:?}", e);
                Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
            })?;

            Ok(Self {
                ctx,
                image_available,
                render_finished,
                in_flight,
            })
        }
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.image_available, None);
            self.ctx.device.destroy_semaphore(self.render_finished, None);
            self.ctx.device.destroy_fence(self.in_flight, None);
        }
    }
}
