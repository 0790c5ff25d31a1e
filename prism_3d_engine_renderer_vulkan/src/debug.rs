/// Validation layer support - debug messenger routed into the engine log
///
/// Compiled only with the `vulkan-validation` feature. Driver validation
/// messages surface through the engine logger at a severity mapped from
/// the Vulkan message severity.

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::{engine_debug, engine_error, engine_info, engine_warn};
use ash::vk;
use std::ffi::CStr;

/// Create the debug-utils messenger for a validation-enabled instance
pub(crate) fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let loader = ash::ext::debug_utils::Instance::new(entry, instance);

    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    let messenger = unsafe {
        loader
            .create_debug_utils_messenger(&create_info, None)
            .map_err(|e| {
                engine_error!("prism3d::vulkan", "Failed to create debug messenger: {:?}", e);
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?
    };

    Ok((loader, messenger))
}

/// Callback invoked by the validation layers
unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() {
        return vk::FALSE;
    }
    let data = *callback_data;
    let message = if data.p_message.is_null() {
        "<no message>".to_string()
    } else {
        CStr::from_ptr(data.p_message).to_string_lossy().into_owned()
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            engine_error!("prism3d::vulkan::validation", "{}", message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            engine_warn!("prism3d::vulkan::validation", "{}", message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => {
            engine_info!("prism3d::vulkan::validation", "{}", message);
        }
        _ => {
            engine_debug!("prism3d::vulkan::validation", "{}", message);
        }
    }

    vk::FALSE
}
