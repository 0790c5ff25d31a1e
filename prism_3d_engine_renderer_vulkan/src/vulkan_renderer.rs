/// VulkanRenderer - frame scheduler and top-level backend object
///
/// Owns the GPU context, the shader registry, the uniform store and the
/// frame resources, and drives the per-frame sequence:
///
/// 1. slot = frame number mod in-flight limit
/// 2. wait (unbounded) on the slot's in-flight fence
/// 3. acquire a swapchain image with the slot's image-available
///    semaphore; out-of-date or a pending resize triggers a full rebuild
///    and a retry (unbounded - a persistently failing device loops)
/// 4. reset the slot's fence
/// 5. upload dirty uniform data
/// 6. submit the pre-recorded command buffer for the acquired image,
///    waiting on image-available at color-attachment-output, signaling
///    render-finished and the fence
/// 7. queue presentation, waiting on render-finished
/// 8. increment the monotonic frame counter
///
/// The fence wait guarantees the CPU never rewrites a sync slot, command
/// buffer, or uniform region the GPU may still be reading; the in-flight
/// limit bounds how many frames of uniform data are in flight at once.

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::prism3d::render::{Config, ShaderStageFlags, VertexInputLayout};
use prism_3d_engine::{engine_debug, engine_error, engine_info, engine_warn, engine_err};
use ash::vk;
use bytemuck::Pod;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_frame_resources::{FrameResources, IN_FLIGHT_FRAME_LIMIT};
use crate::vulkan_geometry::GeometryBuffer;
use crate::vulkan_shader::{ShaderModule, ShaderSet};
use crate::vulkan_sync::in_flight_slot;
use crate::vulkan_uniform_store::{UniformDataHandle, UniformStore};

enum AcquireOutcome {
    Image { index: u32, suboptimal: bool },
    Rebuild,
}

/// Top-level Vulkan backend
pub struct VulkanRenderer {
    ctx: Arc<GpuContext>,
    shaders: ShaderSet,
    uniform_store: UniformStore,
    frame_resources: FrameResources,

    vertex_layout: Option<VertexInputLayout>,
    vertex_buffer: vk::Buffer,
    vertex_count: u32,

    /// Monotonic; wraps only through the slot modulo, never reset
    frame_number: u64,
    /// Edge-triggered resize flag, consumed by the rebuild path only
    resized: bool,
    desired_extent: vk::Extent2D,
}

impl VulkanRenderer {
    /// Create the device context for `window`; rendering setup happens in
    /// `init` once geometry, shaders and uniforms are configured
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: Config,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let ctx = Arc::new(GpuContext::new(window, &config)?);
        let frame_resources = FrameResources::new(Arc::clone(&ctx))?;
        engine_info!("prism3d::vulkan", "Vulkan renderer created");
        Ok(Self {
            ctx,
            shaders: ShaderSet::new(),
            uniform_store: UniformStore::new(),
            frame_resources,
            vertex_layout: None,
            vertex_buffer: vk::Buffer::null(),
            vertex_count: 0,
            frame_number: 0,
            resized: false,
            desired_extent: vk::Extent2D { width, height },
        })
    }

    /// Shared GPU context, for creating device-synced resources
    pub fn context(&self) -> Arc<GpuContext> {
        Arc::clone(&self.ctx)
    }

    /// Describe the vertex stream feeding the pipeline.
    ///
    /// Changing the layout after setup rebuilds the render pipeline.
    pub fn set_vertex_input(&mut self, layout: VertexInputLayout) -> Result<()> {
        let was_set = self.vertex_layout.is_some();
        self.vertex_layout = Some(layout);
        if was_set && self.frame_resources.is_built() {
            self.reset_render_setup()?;
        }
        Ok(())
    }

    /// Point the pipeline at an uploaded geometry buffer.
    ///
    /// Changing the buffer or vertex count after setup re-records the
    /// command buffers via a full rebuild.
    pub fn set_geometry<V: Pod>(&mut self, geometry: &GeometryBuffer<V>) -> Result<()> {
        if geometry.buffer() == vk::Buffer::null() {
            engine_error!("prism3d::vulkan", "set_geometry with a buffer that was never uploaded");
            return Err(Error::Configuration(
                "Geometry must be uploaded with update_device before set_geometry".to_string(),
            ));
        }
        let changed = self.vertex_buffer != vk::Buffer::null()
            && (self.vertex_buffer != geometry.buffer()
                || self.vertex_count != geometry.vertex_count() as u32);
        self.vertex_buffer = geometry.buffer();
        self.vertex_count = geometry.vertex_count() as u32;
        if changed && self.frame_resources.is_built() {
            self.reset_render_setup()?;
        }
        Ok(())
    }

    /// Register the vertex shader under `name`
    pub fn set_vertex_shader(&mut self, name: &str, module: ShaderModule) -> Result<()> {
        self.shaders.set_vertex_shader(name, module)
    }

    /// Register the fragment shader under `name`
    pub fn set_fragment_shader(&mut self, name: &str, module: ShaderModule) -> Result<()> {
        self.shaders.set_fragment_shader(name, module)
    }

    /// Bind uniform data at `binding`; `None` removes with a warning
    pub fn bind_uniform(
        &mut self,
        binding: u32,
        data: Option<UniformDataHandle>,
        stages: ShaderStageFlags,
    ) -> Result<()> {
        self.uniform_store.bind(binding, data, stages);
        if self.frame_resources.is_built() {
            self.reset_render_setup()?;
        }
        Ok(())
    }

    /// Bind per-object uniform data with `instances` dynamic-offset slots
    pub fn bind_uniform_dynamic(
        &mut self,
        binding: u32,
        data: UniformDataHandle,
        stages: ShaderStageFlags,
        instances: u32,
    ) -> Result<()> {
        self.uniform_store.bind_dynamic(binding, data, stages, instances);
        if self.frame_resources.is_built() {
            self.reset_render_setup()?;
        }
        Ok(())
    }

    /// Remove the uniform binding; no-op if absent
    pub fn unbind_uniform(&mut self, binding: u32) -> Result<()> {
        self.uniform_store.unbind(binding);
        if self.frame_resources.is_built() {
            self.reset_render_setup()?;
        }
        Ok(())
    }

    /// Build the rendering setup after geometry, shaders and uniforms are
    /// configured
    pub fn init(&mut self) -> Result<()> {
        if self.vertex_buffer == vk::Buffer::null() {
            engine_error!("prism3d::vulkan", "init() before set_geometry()");
            return Err(Error::Configuration(
                "Rendering setup requires geometry; call set_geometry() first".to_string(),
            ));
        }
        let Some(vertex_layout) = self.vertex_layout.clone() else {
            engine_error!("prism3d::vulkan", "init() before set_vertex_input()");
            return Err(Error::Configuration(
                "Render pipeline cannot be created before vertex input information has been set"
                    .to_string(),
            ));
        };

        // Uniform buffer and descriptor layout must exist before the
        // pipeline references them
        self.uniform_store.update_device(Some(Arc::clone(&self.ctx)))?;
        self.frame_resources.build(
            &self.shaders,
            &vertex_layout,
            self.vertex_buffer,
            self.vertex_count,
            &self.uniform_store,
            self.desired_extent,
        )?;
        engine_info!("prism3d::vulkan", "Render setup complete");
        Ok(())
    }

    /// Mark the surface as resized; consumed by the next frame's rebuild
    pub fn notify_resize(&mut self, width: u32, height: u32) {
        self.desired_extent = vk::Extent2D { width, height };
        self.resized = true;
    }

    /// Tear down and rebuild everything that depends on the swapchain,
    /// then clear the resize flag
    fn reset_render_setup(&mut self) -> Result<()> {
        let Some(vertex_layout) = self.vertex_layout.clone() else {
            engine_error!("prism3d::vulkan", "Rebuild requested before vertex input was set");
            return Err(Error::Configuration(
                "Rebuild requested before vertex input was set".to_string(),
            ));
        };

        self.wait_idle()?;
        self.frame_resources.teardown_swapchain_dependents();

        // Binding-set changes recompute offsets and the descriptor layout
        // here; value-only changes are a no-op
        self.uniform_store.update_device(Some(Arc::clone(&self.ctx)))?;
        self.frame_resources.build(
            &self.shaders,
            &vertex_layout,
            self.vertex_buffer,
            self.vertex_count,
            &self.uniform_store,
            self.desired_extent,
        )?;

        self.resized = false;
        engine_debug!("prism3d::vulkan", "Render setup rebuilt");
        Ok(())
    }

    /// Render and present one frame
    pub fn render_frame(&mut self) -> Result<()> {
        if !self.frame_resources.is_built() {
            engine_error!("prism3d::vulkan", "render_frame() before init()");
            return Err(Error::Configuration(
                "render_frame() called before init()".to_string(),
            ));
        }
        let slot = in_flight_slot(self.frame_number, IN_FLIGHT_FRAME_LIMIT);

        // Wait for this slot's previous frame to drain before touching any
        // of its sync objects
        unsafe {
            let fence = self.frame_resources.frame_sync[slot].in_flight;
            self.ctx
                .device
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to wait for in-flight fence: {:?}", e))?;
        }

        // Acquire a target image, rebuilding on out-of-date or a pending
        // resize and retrying until a usable image arrives
        let image_index = loop {
            if self.resized {
                self.reset_render_setup()?;
            }

            let outcome = {
                let Some(swapchain) = self.frame_resources.swapchain.as_ref() else {
                    engine_error!("prism3d::vulkan", "Swapchain missing during frame acquire");
                    return Err(Error::InvalidResource(
                        "Swapchain missing during frame acquire".to_string(),
                    ));
                };
                let image_available = self.frame_resources.frame_sync[slot].image_available;
                let result = unsafe {
                    swapchain.loader.acquire_next_image(
                        swapchain.swapchain,
                        u64::MAX,
                        image_available,
                        vk::Fence::null(),
                    )
                };
                match result {
                    Ok((index, suboptimal)) => AcquireOutcome::Image { index, suboptimal },
                    Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => AcquireOutcome::Rebuild,
                    Err(e) => {
                        engine_error!("prism3d::vulkan", "Failed to acquire next swapchain image: {:?}", e);
                        return Err(Error::BackendError(format!(
                            "Failed to acquire next swapchain image: {:?}",
                            e
                        )));
                    }
                }
            };

            match outcome {
                AcquireOutcome::Image { index, suboptimal } => {
                    if suboptimal {
                        engine_warn!("prism3d::vulkan", "Swapchain suboptimal, continuing");
                    }
                    break index;
                }
                AcquireOutcome::Rebuild => {
                    self.reset_render_setup()?;
                }
            }
        };

        // Sync handles may have been replaced by a rebuild inside the
        // acquire loop; resolve them after it
        let sync = &self.frame_resources.frame_sync[slot];
        let (image_available, render_finished, in_flight) =
            (sync.image_available, sync.render_finished, sync.in_flight);

        unsafe {
            self.ctx
                .device
                .reset_fences(&[in_flight])
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to reset in-flight fence: {:?}", e))?;
        }

        // Push this frame's uniform values to the device; only dirty
        // blocks are copied
        self.uniform_store.update_device(Some(Arc::clone(&self.ctx)))?;

        // Submit the pre-recorded commands for the acquired image
        unsafe {
            let wait_semaphores = [image_available];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let command_buffers = [self.frame_resources.command_buffers[image_index as usize]];
            let signal_semaphores = [render_finished];

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], in_flight)
                .map_err(|e| engine_err!("prism3d::vulkan", "Submit to graphics queue failed: {:?}", e))?;
        }

        // Queue presentation of the acquired image
        unsafe {
            let Some(swapchain) = self.frame_resources.swapchain.as_ref() else {
                return Err(Error::InvalidResource(
                    "Swapchain disappeared before present".to_string(),
                ));
            };
            let wait_semaphores = [render_finished];
            let swapchains = [swapchain.swapchain];
            let image_indices = [image_index];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            match swapchain
                .loader
                .queue_present(self.ctx.present_queue, &present_info)
            {
                Ok(false) => {}
                Ok(true) => {
                    engine_warn!("prism3d::vulkan", "Swapchain suboptimal at present");
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    // Rebuild on the next frame's acquire path
                    engine_warn!("prism3d::vulkan", "Swapchain out of date at present");
                    self.resized = true;
                }
                Err(e) => {
                    engine_error!("prism3d::vulkan", "Failed to present swapchain image: {:?}", e);
                    return Err(Error::BackendError(format!(
                        "Failed to present swapchain image: {:?}",
                        e
                    )));
                }
            }
        }

        self.frame_number += 1;
        Ok(())
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Current framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let extent = self.frame_resources.extent();
        (extent.width, extent.height)
    }

    /// Block until all submitted GPU work completes
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        // Let in-flight work drain before members release their handles
        unsafe {
            self.ctx.device.device_wait_idle().ok();
        }
    }
}
