/// RenderPipeline - render pass, pipeline layout and graphics pipeline
///
/// Built against the current swapchain format and extent, so it is torn
/// down and rebuilt with the swapchain. The caller resolves shader stages
/// and the uniform descriptor layout before construction; missing either
/// is a configuration error surfaced at the call site.

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::prism3d::render::{AttributeFormat, VertexInputLayout};
use prism_3d_engine::{engine_debug, engine_error};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Graphics pipeline and the objects it is built from
pub struct RenderPipeline {
    ctx: Arc<GpuContext>,
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) pipeline_layout: vk::PipelineLayout,
    pub(crate) pipeline: vk::Pipeline,
}

impl RenderPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: Arc<GpuContext>,
        color_format: vk::Format,
        depth_format: vk::Format,
        extent: vk::Extent2D,
        vertex_layout: &VertexInputLayout,
        vertex_module: vk::ShaderModule,
        fragment_module: vk::ShaderModule,
        descriptor_set_layout: vk::DescriptorSetLayout,
    ) -> Result<Self> {
        unsafe {
            let render_pass = Self::create_render_pass(&ctx, color_format, depth_format)?;

            // Shader stages
            let stages = [
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::VERTEX)
                    .module(vertex_module)
                    .name(c"main"),
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(fragment_module)
                    .name(c"main"),
            ];

            // Vertex input from the backend-agnostic layout description
            let binding_descriptions = [vk::VertexInputBindingDescription {
                binding: vertex_layout.binding,
                stride: vertex_layout.stride,
                input_rate: vk::VertexInputRate::VERTEX,
            }];
            let attribute_descriptions: Vec<vk::VertexInputAttributeDescription> = vertex_layout
                .attributes
                .iter()
                .map(|attr| vk::VertexInputAttributeDescription {
                    location: attr.location,
                    binding: vertex_layout.binding,
                    format: attribute_format_to_vk(attr.format),
                    offset: attr.offset,
                })
                .collect();
            let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&binding_descriptions)
                .vertex_attribute_descriptions(&attribute_descriptions);

            let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

            // Static viewport covering the whole swapchain extent
            let viewports = [vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            }];
            let scissors = [vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            }];
            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewports(&viewports)
                .scissors(&scissors);

            let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
                .polygon_mode(vk::PolygonMode::FILL)
                .cull_mode(vk::CullModeFlags::NONE)
                .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
                .line_width(1.0);

            let multisample = vk::PipelineMultisampleStateCreateInfo::default()
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(true)
                .depth_write_enable(true)
                .depth_compare_op(vk::CompareOp::LESS);

            let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
                .blend_enable(false)
                .color_write_mask(vk::ColorComponentFlags::RGBA)];
            let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
                .attachments(&color_blend_attachments);

            let set_layouts = [descriptor_set_layout];
            let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
            let pipeline_layout = ctx
                .device
                .create_pipeline_layout(&layout_info, None)
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to create pipeline layout: {:?}", e);
                    unsafe {
                        ctx.device.destroy_render_pass(render_pass, None);
                    }
                    Error::InitializationFailed(format!("Failed to create pipeline layout: {:?}", e))
                })?;

            let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&stages)
                .vertex_input_state(&vertex_input)
                .input_assembly_state(&input_assembly)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization)
                .multisample_state(&multisample)
                .depth_stencil_state(&depth_stencil)
                .color_blend_state(&color_blend)
                .layout(pipeline_layout)
                .render_pass(render_pass)
                .subpass(0);

            let pipeline = ctx
                .device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|(_, e)| {
                    engine_error!("prism3d::vulkan", "Failed to create graphics pipeline: {:?}", e);
                    unsafe {
                        ctx.device.destroy_pipeline_layout(pipeline_layout, None);
                        ctx.device.destroy_render_pass(render_pass, None);
                    }
                    Error::InitializationFailed(format!("Failed to create graphics pipeline: {:?}", e))
                })?[0];

            engine_debug!("prism3d::vulkan", "Graphics pipeline built for {:?}", extent);
            Ok(Self {
                ctx,
                render_pass,
                pipeline_layout,
                pipeline,
            })
        }
    }

    unsafe fn create_render_pass(
        ctx: &Arc<GpuContext>,
        color_format: vk::Format,
        depth_format: vk::Format,
    ) -> Result<vk::RenderPass> {
        let attachments = [
            // Color: cleared, stored, ends ready for presentation
            vk::AttachmentDescription {
                format: color_format,
                samples: vk::SampleCountFlags::TYPE_1,
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
                initial_layout: vk::ImageLayout::UNDEFINED,
                final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
                ..Default::default()
            },
            // Depth: cleared, discarded after the pass
            vk::AttachmentDescription {
                format: depth_format,
                samples: vk::SampleCountFlags::TYPE_1,
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::DONT_CARE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
                initial_layout: vk::ImageLayout::UNDEFINED,
                final_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                ..Default::default()
            },
        ];

        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };
        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)];

        let dependencies = [vk::SubpassDependency {
            src_subpass: vk::SUBPASS_EXTERNAL,
            dst_subpass: 0,
            src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            src_access_mask: vk::AccessFlags::empty(),
            dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            ..Default::default()
        }];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        ctx.device
            .create_render_pass(&create_info, None)
            .map_err(|e| {
                engine_error!("prism3d::vulkan", "Failed to create render pass: {:?}", e);
                Error::InitializationFailed(format!("Failed to create render pass: {:?}", e))
            })
    }
}

impl Drop for RenderPipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

/// Convert an engine attribute format to the Vulkan format
fn attribute_format_to_vk(format: AttributeFormat) -> vk::Format {
    match format {
        AttributeFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        AttributeFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        AttributeFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
    }
}
