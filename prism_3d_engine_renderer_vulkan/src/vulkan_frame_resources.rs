/// FrameResources - swapchain-dependent resource lifecycle
///
/// Owns everything that must be torn down and recreated when the
/// swapchain is invalidated: the swapchain itself, the pipeline, depth
/// resources, framebuffers, per-image command buffers, the uniform
/// descriptor pool/set, and the ring of in-flight sync triples. The
/// command pool is created once and reused across rebuilds.
///
/// The build sequence is ordered; each stage depends on outputs of the
/// previous one:
/// swapchain + views -> pipeline -> depth -> framebuffers -> command
/// buffers -> descriptor set -> pre-recorded commands -> sync ring.
///
/// Invariants: one command buffer and one framebuffer per swapchain
/// image; sync triples sized by the in-flight limit, independent of the
/// image count.

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::prism3d::render::VertexInputLayout;
use prism_3d_engine::{engine_debug, engine_error, engine_err};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_depth::{find_depth_format, DepthResources};
use crate::vulkan_pipeline::RenderPipeline;
use crate::vulkan_shader::ShaderSet;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_sync::FrameSync;
use crate::vulkan_uniform_store::UniformStore;

/// Number of frames that may be in flight simultaneously
pub(crate) const IN_FLIGHT_FRAME_LIMIT: usize = 2;

/// Swapchain-size-dependent resources plus the persistent command pool
pub struct FrameResources {
    ctx: Arc<GpuContext>,

    /// Created once, reused across rebuilds
    command_pool: vk::CommandPool,

    pub(crate) swapchain: Option<Swapchain>,
    pipeline: Option<RenderPipeline>,
    depth: Option<DepthResources>,
    framebuffers: Vec<vk::Framebuffer>,
    pub(crate) command_buffers: Vec<vk::CommandBuffer>,
    descriptor_pool: vk::DescriptorPool,
    descriptor_set: vk::DescriptorSet,
    pub(crate) frame_sync: Vec<FrameSync>,
}

impl FrameResources {
    /// Create the persistent command pool; everything else is built by
    /// `build`
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(ctx.graphics_queue_family);
        let command_pool = unsafe {
            ctx.device.create_command_pool(&pool_info, None).map_err(|e| {
                engine_error!("prism3d::vulkan", "Failed to create command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
            })?
        };

        Ok(Self {
            ctx,
            command_pool,
            swapchain: None,
            pipeline: None,
            depth: None,
            framebuffers: Vec::new(),
            command_buffers: Vec::new(),
            descriptor_pool: vk::DescriptorPool::null(),
            descriptor_set: vk::DescriptorSet::null(),
            frame_sync: Vec::new(),
        })
    }

    pub fn is_built(&self) -> bool {
        self.swapchain.is_some()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain
            .as_ref()
            .map(|swapchain| swapchain.extent())
            .unwrap_or_default()
    }

    /// Run the full build sequence against the current surface state.
    ///
    /// The uniform store must already be uploaded (its buffer and
    /// descriptor layout exist); shader and vertex-layout configuration
    /// errors surface before any device objects are created.
    pub fn build(
        &mut self,
        shaders: &ShaderSet,
        vertex_layout: &VertexInputLayout,
        vertex_buffer: vk::Buffer,
        vertex_count: u32,
        uniform_store: &UniformStore,
        desired_extent: vk::Extent2D,
    ) -> Result<()> {
        // Stage ordering matters; see module docs
        let swapchain = Swapchain::new(Arc::clone(&self.ctx), desired_extent)?;

        let (vertex_module, fragment_module) = shaders.resolve_stages()?;
        let depth_format = find_depth_format(&self.ctx)?;
        let pipeline = RenderPipeline::new(
            Arc::clone(&self.ctx),
            swapchain.format,
            depth_format,
            swapchain.extent(),
            vertex_layout,
            vertex_module,
            fragment_module,
            uniform_store.descriptor_set_layout()?,
        )?;

        let depth = DepthResources::new(Arc::clone(&self.ctx), swapchain.extent())?;

        self.swapchain = Some(swapchain);
        self.pipeline = Some(pipeline);
        self.depth = Some(depth);

        self.create_framebuffers()?;
        self.allocate_command_buffers()?;
        self.create_descriptor_set(uniform_store)?;
        self.record_command_buffers(vertex_buffer, vertex_count, uniform_store)?;

        for _ in 0..IN_FLIGHT_FRAME_LIMIT {
            self.frame_sync.push(FrameSync::new(Arc::clone(&self.ctx))?);
        }

        engine_debug!(
            "prism3d::vulkan",
            "Frame resources built: {} images, {} in-flight slots",
            self.command_buffers.len(),
            self.frame_sync.len()
        );
        Ok(())
    }

    /// Tear down every swapchain-size-dependent resource, preserving the
    /// command pool (and, at the callers, shader modules, the geometry
    /// buffer and the uniform buffer).
    pub fn teardown_swapchain_dependents(&mut self) {
        unsafe {
            self.frame_sync.clear();

            if self.descriptor_pool != vk::DescriptorPool::null() {
                // Frees the set allocated from it as well
                self.ctx.device.destroy_descriptor_pool(self.descriptor_pool, None);
                self.descriptor_pool = vk::DescriptorPool::null();
                self.descriptor_set = vk::DescriptorSet::null();
            }

            if !self.command_buffers.is_empty() {
                self.ctx
                    .device
                    .free_command_buffers(self.command_pool, &self.command_buffers);
                self.command_buffers.clear();
            }

            for &framebuffer in &self.framebuffers {
                self.ctx.device.destroy_framebuffer(framebuffer, None);
            }
            self.framebuffers.clear();
        }

        self.pipeline = None;
        self.depth = None;
        self.swapchain = None;
    }

    fn create_framebuffers(&mut self) -> Result<()> {
        let (Some(swapchain), Some(pipeline), Some(depth)) =
            (self.swapchain.as_ref(), self.pipeline.as_ref(), self.depth.as_ref())
        else {
            engine_error!("prism3d::vulkan", "Framebuffer creation before swapchain/pipeline/depth");
            return Err(Error::InvalidResource(
                "Framebuffer creation before swapchain/pipeline/depth".to_string(),
            ));
        };

        let extent = swapchain.extent();
        for (index, &view) in swapchain.image_views.iter().enumerate() {
            let attachments = [view, depth.image_view];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(pipeline.render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);
            let framebuffer = unsafe {
                self.ctx.device.create_framebuffer(&create_info, None).map_err(|e| {
                    engine_err!(
                        "prism3d::vulkan",
                        "Failed to create framebuffer for swapchain image {}: {:?}",
                        index,
                        e
                    )
                })?
            };
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    fn allocate_command_buffers(&mut self) -> Result<()> {
        // One primary command buffer per swapchain image
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(self.framebuffers.len() as u32);
        self.command_buffers = unsafe {
            self.ctx.device.allocate_command_buffers(&alloc_info).map_err(|e| {
                engine_error!("prism3d::vulkan", "Failed to allocate command buffers: {:?}", e);
                Error::InitializationFailed(format!("Failed to allocate command buffers: {:?}", e))
            })?
        };
        Ok(())
    }

    fn create_descriptor_set(&mut self, uniform_store: &UniformStore) -> Result<()> {
        let pool_sizes = uniform_store.descriptor_pool_sizes();
        if pool_sizes.is_empty() {
            engine_error!("prism3d::vulkan", "Descriptor pool requested with no bound uniforms");
            return Err(Error::Configuration(
                "Descriptor pool requested with no bound uniforms".to_string(),
            ));
        }

        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(1);
        self.descriptor_pool = unsafe {
            self.ctx.device.create_descriptor_pool(&pool_info, None).map_err(|e| {
                engine_error!("prism3d::vulkan", "Failed to create descriptor pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
            })?
        };

        let set_layouts = [uniform_store.descriptor_set_layout()?];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(&set_layouts);
        self.descriptor_set = unsafe {
            self.ctx.device.allocate_descriptor_sets(&alloc_info).map_err(|e| {
                engine_error!("prism3d::vulkan", "Failed to allocate descriptor set: {:?}", e);
                Error::InitializationFailed(format!("Failed to allocate descriptor set: {:?}", e))
            })?[0]
        };

        uniform_store.write_descriptor_set(self.descriptor_set)
    }

    /// Pre-record every per-image command buffer: bind pipeline and vertex
    /// buffer, then one draw per object with that object's dynamic
    /// offsets.
    fn record_command_buffers(
        &self,
        vertex_buffer: vk::Buffer,
        vertex_count: u32,
        uniform_store: &UniformStore,
    ) -> Result<()> {
        let (Some(swapchain), Some(pipeline)) = (self.swapchain.as_ref(), self.pipeline.as_ref())
        else {
            engine_error!("prism3d::vulkan", "Command recording before swapchain/pipeline");
            return Err(Error::InvalidResource(
                "Command recording before swapchain/pipeline".to_string(),
            ));
        };

        // Draw count follows the bound dynamic instances; a store with
        // only shared blocks still draws once
        let draw_count = uniform_store.dynamic_instance_count().max(1);

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.0, 0.0, 0.0, 1.0],
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        for (index, &command_buffer) in self.command_buffers.iter().enumerate() {
            unsafe {
                let begin_info = vk::CommandBufferBeginInfo::default();
                self.ctx
                    .device
                    .begin_command_buffer(command_buffer, &begin_info)
                    .map_err(|e| {
                        engine_err!(
                            "prism3d::vulkan",
                            "Failed to begin recording command buffer {}: {:?}",
                            index,
                            e
                        )
                    })?;

                let render_pass_begin = vk::RenderPassBeginInfo::default()
                    .render_pass(pipeline.render_pass)
                    .framebuffer(self.framebuffers[index])
                    .render_area(vk::Rect2D {
                        offset: vk::Offset2D { x: 0, y: 0 },
                        extent: swapchain.extent(),
                    })
                    .clear_values(&clear_values);

                self.ctx.device.cmd_begin_render_pass(
                    command_buffer,
                    &render_pass_begin,
                    vk::SubpassContents::INLINE,
                );
                self.ctx.device.cmd_bind_pipeline(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    pipeline.pipeline,
                );
                self.ctx.device.cmd_bind_vertex_buffers(
                    command_buffer,
                    0,
                    &[vertex_buffer],
                    &[0],
                );

                for object in 0..draw_count {
                    let dynamic_offsets = uniform_store.dynamic_offsets(object);
                    self.ctx.device.cmd_bind_descriptor_sets(
                        command_buffer,
                        vk::PipelineBindPoint::GRAPHICS,
                        pipeline.pipeline_layout,
                        0,
                        &[self.descriptor_set],
                        &dynamic_offsets,
                    );
                    self.ctx.device.cmd_draw(command_buffer, vertex_count, 1, 0, 0);
                }

                self.ctx.device.cmd_end_render_pass(command_buffer);
                self.ctx
                    .device
                    .end_command_buffer(command_buffer)
                    .map_err(|e| {
                        engine_err!(
                            "prism3d::vulkan",
                            "Failed to end command buffer {}: {:?}",
                            index,
                            e
                        )
                    })?;
            }
        }
        Ok(())
    }
}

impl Drop for FrameResources {
    fn drop(&mut self) {
        self.teardown_swapchain_dependents();
        unsafe {
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
