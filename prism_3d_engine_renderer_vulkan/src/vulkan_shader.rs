/// Shader module wrapper and the named shader registry
///
/// Modules are registered under caller-chosen names; the pipeline build
/// resolves exactly one vertex and one fragment key. Shader modules are
/// independent of the swapchain and survive rebuilds.

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::{engine_debug, engine_error, engine_err};
use ash::vk;
use rustc_hash::FxHashMap;
use std::io::Cursor;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

#[cfg(test)]
mod vulkan_shader_tests;

/// Compiled shader module with RAII cleanup
pub struct ShaderModule {
    ctx: Arc<GpuContext>,
    pub(crate) module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a module from raw SPIR-V bytes (as read from a compiled
    /// `.spv` file)
    pub fn from_spirv_bytes(ctx: Arc<GpuContext>, bytes: &[u8]) -> Result<Self> {
        let code = ash::util::read_spv(&mut Cursor::new(bytes))
            .map_err(|e| engine_err!("prism3d::vulkan", "Invalid SPIR-V bytecode: {:?}", e))?;
        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe {
            ctx.device
                .create_shader_module(&create_info, None)
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to create shader module: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create shader module: {:?}", e))
                })?
        };
        Ok(Self { ctx, module })
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Registry of named shader modules with designated vertex/fragment keys
///
/// The pipeline cannot be built until both keys are set; setting either
/// validates that the name is non-empty and that the two keys differ.
#[derive(Default)]
pub struct ShaderSet {
    modules: FxHashMap<String, ShaderModule>,
    vertex_key: Option<String>,
    fragment_key: Option<String>,
}

impl ShaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` under `name` and designate it the vertex shader
    pub fn set_vertex_shader(&mut self, name: &str, module: ShaderModule) -> Result<()> {
        Self::validate_key(name, self.fragment_key.as_deref())?;
        self.modules.insert(name.to_string(), module);
        self.vertex_key = Some(name.to_string());
        engine_debug!("prism3d::vulkan", "Vertex shader set: '{}'", name);
        Ok(())
    }

    /// Register `module` under `name` and designate it the fragment shader
    pub fn set_fragment_shader(&mut self, name: &str, module: ShaderModule) -> Result<()> {
        Self::validate_key(name, self.vertex_key.as_deref())?;
        self.modules.insert(name.to_string(), module);
        self.fragment_key = Some(name.to_string());
        engine_debug!("prism3d::vulkan", "Fragment shader set: '{}'", name);
        Ok(())
    }

    fn validate_key(name: &str, other_key: Option<&str>) -> Result<()> {
        if name.is_empty() {
            engine_error!("prism3d::vulkan", "Shader name must be a non-empty string");
            return Err(Error::Configuration(
                "Shader name must be a non-empty string".to_string(),
            ));
        }
        if other_key == Some(name) {
            engine_error!(
                "prism3d::vulkan",
                "Vertex and fragment shaders cannot share the key '{}'",
                name
            );
            return Err(Error::Configuration(format!(
                "Vertex and fragment shaders cannot share the key '{}'",
                name
            )));
        }
        Ok(())
    }

    /// Resolve the designated vertex and fragment modules.
    ///
    /// Missing keys or keys that no longer map to a module are fatal
    /// configuration errors, surfaced before any pipeline work starts.
    pub fn resolve_stages(&self) -> Result<(vk::ShaderModule, vk::ShaderModule)> {
        let vertex_key = self.vertex_key.as_deref().ok_or_else(|| {
            engine_error!("prism3d::vulkan", "No vertex shader has been set");
            Error::Configuration(
                "No vertex shader has been set; call set_vertex_shader() first".to_string(),
            )
        })?;
        let fragment_key = self.fragment_key.as_deref().ok_or_else(|| {
            engine_error!("prism3d::vulkan", "No fragment shader has been set");
            Error::Configuration(
                "No fragment shader has been set; call set_fragment_shader() first".to_string(),
            )
        })?;

        let vertex = self.modules.get(vertex_key).ok_or_else(|| {
            engine_error!(
                "prism3d::vulkan",
                "Vertex shader key '{}' does not map to a module",
                vertex_key
            );
            Error::Configuration(format!(
                "Vertex shader key '{}' does not map to a module",
                vertex_key
            ))
        })?;
        let fragment = self.modules.get(fragment_key).ok_or_else(|| {
            engine_error!(
                "prism3d::vulkan",
                "Fragment shader key '{}' does not map to a module",
                fragment_key
            );
            Error::Configuration(format!(
                "Fragment shader key '{}' does not map to a module",
                fragment_key
            ))
        })?;

        Ok((vertex.module, fragment.module))
    }

    pub fn is_complete(&self) -> bool {
        self.vertex_key.is_some() && self.fragment_key.is_some()
    }
}
