/// Depth resources sized to the current swapchain extent
///
/// One depth image + view shared by every framebuffer. Torn down and
/// recreated with the swapchain, since its size tracks the swapchain
/// extent.

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::{engine_error, engine_err};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Pick the first depth format with optimal-tiling depth attachment
/// support, in preference order
pub(crate) fn find_depth_format(ctx: &GpuContext) -> Result<vk::Format> {
    let candidates = [
        vk::Format::D32_SFLOAT,
        vk::Format::D32_SFLOAT_S8_UINT,
        vk::Format::D24_UNORM_S8_UINT,
    ];
    for format in candidates {
        let props = unsafe {
            ctx.instance
                .get_physical_device_format_properties(ctx.physical_device, format)
        };
        if props
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        {
            return Ok(format);
        }
    }
    engine_error!("prism3d::vulkan", "No supported depth attachment format found");
    Err(Error::InitializationFailed(
        "No supported depth attachment format found".to_string(),
    ))
}

/// Depth image, memory and view
pub struct DepthResources {
    ctx: Arc<GpuContext>,
    image: vk::Image,
    allocation: Option<Allocation>,
    pub(crate) image_view: vk::ImageView,
    pub(crate) format: vk::Format,
}

impl DepthResources {
    pub fn new(ctx: Arc<GpuContext>, extent: vk::Extent2D) -> Result<Self> {
        let format = find_depth_format(&ctx)?;

        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .extent(vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .format(format)
                .tiling(vk::ImageTiling::OPTIMAL)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
                .samples(vk::SampleCountFlags::TYPE_1)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let image = ctx.device.create_image(&image_info, None)
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to create depth image: {:?}", e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = {
                let mut allocator = ctx.allocator.lock().map_err(|_| {
                    engine_err!("prism3d::vulkan", "GPU allocator lock poisoned")
                })?;
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: "depth image",
                        requirements,
                        location: MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|e| {
                        engine_error!("prism3d::vulkan", "Failed to allocate depth image memory: {:?}", e);
                        Error::OutOfMemory
                    })?
            };

            ctx.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to bind depth image memory: {:?}", e))?;

            let aspect = if has_stencil_component(format) {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            } else {
                vk::ImageAspectFlags::DEPTH
            };
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: aspect,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let image_view = ctx.device.create_image_view(&view_info, None)
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to create depth image view: {:?}", e))?;

            Ok(Self {
                ctx,
                image,
                allocation: Some(allocation),
                image_view,
                format,
            })
        }
    }
}

fn has_stencil_component(format: vk::Format) -> bool {
    format == vk::Format::D32_SFLOAT_S8_UINT || format == vk::Format::D24_UNORM_S8_UINT
}

impl Drop for DepthResources {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.image_view, None);
            self.ctx.device.destroy_image(self.image, None);
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if the lock fails - the image is already gone
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
        }
    }
}
