/// Renderer configuration
///
/// Instance/device/extension selection is plain data resolved once at
/// renderer construction. Required entries that the runtime cannot supply
/// are fatal; requested entries are enabled when present and skipped with
/// a warning otherwise.

/// Renderer configuration passed at backend construction
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name (reported to the driver)
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Enable validation layers and the debug messenger
    pub enable_validation: bool,
    /// Instance extensions that must be available (beyond the windowing
    /// system's own surface extensions, which are always added)
    pub required_instance_extensions: Vec<String>,
    /// Instance extensions enabled only when available
    pub requested_instance_extensions: Vec<String>,
    /// Device extensions that must be available
    pub required_device_extensions: Vec<String>,
    /// Device extensions enabled only when available
    pub requested_device_extensions: Vec<String>,
    /// Validation layers enabled only when available
    pub requested_validation_layers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Prism3D Application".to_string(),
            app_version: (0, 1, 0),
            enable_validation: cfg!(debug_assertions),
            required_instance_extensions: Vec::new(),
            requested_instance_extensions: Vec::new(),
            // The swapchain extension is the one hard device requirement of
            // the frame loop; callers may append more.
            required_device_extensions: vec!["VK_KHR_swapchain".to_string()],
            requested_device_extensions: Vec::new(),
            requested_validation_layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
        }
    }
}
