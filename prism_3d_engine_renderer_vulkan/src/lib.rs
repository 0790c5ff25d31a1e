/*!
# Prism 3D Engine - Vulkan Renderer Backend

Vulkan implementation of the Prism3D device and frame machinery, built on
the Ash bindings and gpu-allocator for memory management.

The backend owns the device-resource lifecycle: swapchain, depth buffer,
pipeline, framebuffers, pre-recorded command buffers, the packed uniform
buffer, and the fixed ring of per-in-flight-frame synchronization
primitives. `VulkanRenderer` drives the triple-buffered frame loop and
rebuilds every swapchain-dependent resource on resize or swapchain
invalidation.
*/

// Vulkan implementation modules
mod vulkan_context;
mod vulkan_swapchain;
mod vulkan_depth;
mod vulkan_geometry;
mod vulkan_uniform_store;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_sync;
mod vulkan_frame_resources;
mod vulkan_renderer;
#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan_context::GpuContext;
pub use vulkan_geometry::GeometryBuffer;
pub use vulkan_uniform_store::{UniformDataHandle, UniformStore};
pub use vulkan_shader::{ShaderModule, ShaderSet};
pub use vulkan_renderer::VulkanRenderer;
