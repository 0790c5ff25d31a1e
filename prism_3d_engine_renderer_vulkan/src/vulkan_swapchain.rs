/// Swapchain - presentable image set and its negotiation policies
///
/// Capability negotiation is factored into pure functions so the selection
/// policies are testable without a device:
/// - surface format: prefer 32-bit BGRA with sRGB nonlinear color space,
///   else the first reported format
/// - present mode: fixed preference ranking
///   (mailbox > fifo-relaxed > fifo > immediate > shared-refresh modes)
/// - extent: the surface's current extent, or the desired size clamped to
///   the reported bounds when the surface reports no fixed extent
/// - image count: min + 1, capped by max when max is nonzero

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::{engine_debug, engine_error, engine_err};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

#[cfg(test)]
mod vulkan_swapchain_tests;

/// Preferred surface format: 32-bit BGRA, sRGB nonlinear
pub(crate) fn select_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .find(|format| {
            format.format == vk::Format::B8G8R8A8_UNORM
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .copied()
        .unwrap_or(formats[0])
}

/// Present mode by fixed preference ranking. Ties cannot occur: every mode
/// has a distinct score, so enumeration order never decides.
pub(crate) fn select_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    fn score(mode: vk::PresentModeKHR) -> i32 {
        match mode {
            vk::PresentModeKHR::MAILBOX => 5,
            vk::PresentModeKHR::FIFO_RELAXED => 4,
            vk::PresentModeKHR::FIFO => 3,
            vk::PresentModeKHR::IMMEDIATE => 2,
            vk::PresentModeKHR::SHARED_DEMAND_REFRESH => 1,
            vk::PresentModeKHR::SHARED_CONTINUOUS_REFRESH => 0,
            _ => -1,
        }
    }

    let mut best_mode = vk::PresentModeKHR::FIFO;
    let mut best_score = -1;
    for &mode in modes {
        if score(mode) > best_score {
            best_score = score(mode);
            best_mode = mode;
        }
    }
    best_mode
}

/// Swapchain extent: the surface's fixed extent when it reports one,
/// otherwise the desired size clamped to the reported bounds
pub(crate) fn select_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Requested image count: one more than the minimum, capped by the maximum
/// when the device reports one (max of 0 means unbounded)
pub(crate) fn select_image_count(min_image_count: u32, max_image_count: u32) -> u32 {
    if max_image_count == 0 {
        min_image_count + 1
    } else {
        (min_image_count + 1).min(max_image_count)
    }
}

/// Vulkan swapchain: images, views, format and extent
///
/// Recreated from scratch on resize or invalidation; `FrameResources`
/// orchestrates the teardown/rebuild ordering.
pub struct Swapchain {
    ctx: Arc<GpuContext>,
    pub(crate) loader: ash::khr::swapchain::Device,
    pub(crate) swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    pub(crate) image_views: Vec<vk::ImageView>,
    pub(crate) format: vk::Format,
    pub(crate) extent: vk::Extent2D,
}

impl Swapchain {
    /// Negotiate capabilities and create the swapchain and one view per
    /// image
    pub fn new(ctx: Arc<GpuContext>, desired_extent: vk::Extent2D) -> Result<Self> {
        unsafe {
            let capabilities = ctx
                .surface_loader
                .get_physical_device_surface_capabilities(ctx.physical_device, ctx.surface)
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to get surface capabilities: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
                })?;

            let formats = ctx
                .surface_loader
                .get_physical_device_surface_formats(ctx.physical_device, ctx.surface)
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to query surface formats: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
                })?;
            let present_modes = ctx
                .surface_loader
                .get_physical_device_surface_present_modes(ctx.physical_device, ctx.surface)
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to query present modes: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get present modes: {:?}", e))
                })?;
            if formats.is_empty() || present_modes.is_empty() {
                engine_error!("prism3d::vulkan", "Selected device does not support presentation");
                return Err(Error::InitializationFailed(
                    "Selected device does not support presentation".to_string(),
                ));
            }

            let surface_format = select_surface_format(&formats);
            let present_mode = select_present_mode(&present_modes);
            let extent = select_extent(&capabilities, desired_extent);
            let image_count = select_image_count(
                capabilities.min_image_count,
                capabilities.max_image_count,
            );
            engine_debug!(
                "prism3d::vulkan",
                "Swapchain: {}x{}, {:?}/{:?}, {:?}, {} images requested",
                extent.width,
                extent.height,
                surface_format.format,
                surface_format.color_space,
                present_mode,
                image_count
            );

            // Graphics and present queues may differ; share images between
            // them when they do
            let queue_family_indices = [ctx.graphics_queue_family, ctx.present_queue_family];
            let same_family = ctx.graphics_queue_family == ctx.present_queue_family;

            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(ctx.surface)
                .min_image_count(image_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true);
            create_info = if same_family {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            } else {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&queue_family_indices)
            };

            let loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);
            let swapchain = loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;

            let images = loader
                .get_swapchain_images(swapchain)
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to get swapchain images: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
                })?;

            let mut image_views = Vec::with_capacity(images.len());
            for (index, &image) in images.iter().enumerate() {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                let view = ctx.device.create_image_view(&view_info, None).map_err(|e| {
                    engine_err!(
                        "prism3d::vulkan",
                        "Failed to create view for swapchain image {}: {:?}",
                        index,
                        e
                    )
                })?;
                image_views.push(view);
            }

            engine_debug!("prism3d::vulkan", "Swapchain created with {} images", images.len());
            Ok(Self {
                ctx,
                loader,
                swapchain,
                images,
                image_views,
                format: surface_format.format,
                extent,
            })
        }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.ctx.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
