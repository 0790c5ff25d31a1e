/// GpuContext - shared GPU state for all Vulkan objects
///
/// One context owns the instance, surface, physical/logical device, queues
/// and the GPU memory allocator. Every device-backed resource holds an
/// `Arc<GpuContext>`, so the context outlives all of them and its `Drop`
/// releases the device-level handles exactly once, on every exit path.

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::prism3d::render::Config;
use prism_3d_engine::{engine_debug, engine_info, engine_warn, engine_error, engine_err};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::sync::Mutex;

/// Shared GPU context
pub struct GpuContext {
    /// Vulkan entry point (kept loaded for the lifetime of the context)
    _entry: ash::Entry,
    /// Vulkan instance
    pub instance: ash::Instance,
    /// Selected physical device
    pub physical_device: vk::PhysicalDevice,
    /// Vulkan logical device
    pub device: ash::Device,

    /// Graphics queue and its family index
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,
    /// Present queue and its family index (may equal the graphics queue)
    pub present_queue: vk::Queue,
    pub present_queue_family: u32,

    /// Presentation surface
    pub surface: vk::SurfaceKHR,
    pub surface_loader: ash::khr::surface::Instance,

    /// Device limit governing uniform block packing
    pub min_uniform_buffer_offset_alignment: u64,

    /// GPU memory allocator (mutex for &self access from resources)
    /// Wrapped in ManuallyDrop so it is released before the device
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    #[cfg(feature = "vulkan-validation")]
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    /// Create the Vulkan instance, surface, device, queues and allocator
    /// for the given window, driven entirely by `config`.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &Config,
    ) -> Result<Self> {
        unsafe {
            // Create Vulkan Entry
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            // Application Info
            let app_name = CString::new(config.app_name.clone())
                .unwrap_or_else(|_| c"Prism3D Application".to_owned());
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Prism3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            // Gather instance extensions: the windowing system's surface
            // extensions are always required, then the config lists.
            let display_handle = window.display_handle()
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to get display handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get display handle: {}", e))
                })?;
            let mut extension_ptrs = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            let available_extensions = entry
                .enumerate_instance_extension_properties(None)
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to enumerate instance extensions: {:?}", e))?;
            let extension_cstrings = Self::match_extensions(
                &available_extensions,
                &config.required_instance_extensions,
                &config.requested_instance_extensions,
                "instance extension",
            )?;
            extension_ptrs.extend(extension_cstrings.iter().map(|name| name.as_ptr()));

            #[cfg(feature = "vulkan-validation")]
            if config.enable_validation {
                extension_ptrs.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            // Validation layers (requested: enabled only when available)
            let mut layer_cstrings: Vec<CString> = Vec::new();
            if config.enable_validation {
                let available_layers = entry
                    .enumerate_instance_layer_properties()
                    .map_err(|e| engine_err!("prism3d::vulkan", "Failed to enumerate layers: {:?}", e))?;
                for requested in &config.requested_validation_layers {
                    let found = available_layers.iter().any(|layer| {
                        unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) }
                            .to_str()
                            .map(|name| name == requested)
                            .unwrap_or(false)
                    });
                    if found {
                        engine_debug!("prism3d::vulkan", "Enabling validation layer '{}'", requested);
                        if let Ok(cstring) = CString::new(requested.clone()) {
                            layer_cstrings.push(cstring);
                        }
                    } else {
                        engine_warn!("prism3d::vulkan", "Requested validation layer '{}' not available", requested);
                    }
                }
            }
            let layer_ptrs: Vec<*const std::ffi::c_char> =
                layer_cstrings.iter().map(|name| name.as_ptr()).collect();

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_ptrs)
                .enabled_extension_names(&extension_ptrs);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            // Setup debug messenger if validation is enabled
            #[cfg(feature = "vulkan-validation")]
            let (debug_utils_loader, debug_messenger) = if config.enable_validation {
                let (loader, messenger) = crate::debug::create_debug_messenger(&entry, &instance)?;
                (Some(loader), Some(messenger))
            } else {
                (None, None)
            };

            // Create Surface
            let window_handle = window.window_handle()
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to get window handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get window handle: {}", e))
                })?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("prism3d::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Pick the best-scoring physical device
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to enumerate physical devices: {:?}", e);
                    Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
                })?;

            let physical_device = Self::select_physical_device(
                &instance,
                &surface_loader,
                surface,
                &physical_devices,
            )?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = CStr::from_ptr(properties.device_name.as_ptr());
            engine_info!("prism3d::vulkan", "Selected GPU: {:?} ({:?})", device_name, properties.device_type);

            // Find Queue Families
            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);

            let graphics_family_index = queue_families
                .iter()
                .enumerate()
                .find(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|(i, _)| i as u32)
                .ok_or_else(|| {
                    engine_error!("prism3d::vulkan", "No graphics queue family found");
                    Error::InitializationFailed("No graphics queue family found".to_string())
                })?;

            let present_family_index = (0..queue_families.len() as u32)
                .find(|&i| {
                    unsafe {
                        surface_loader.get_physical_device_surface_support(physical_device, i, surface)
                    }
                    .unwrap_or(false)
                })
                .ok_or_else(|| {
                    engine_error!("prism3d::vulkan", "No present queue family found");
                    Error::InitializationFailed("No present queue family found".to_string())
                })?;

            // Create Logical Device
            let queue_priorities = [1.0];
            let queue_create_infos = if graphics_family_index == present_family_index {
                vec![
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(graphics_family_index)
                        .queue_priorities(&queue_priorities),
                ]
            } else {
                vec![
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(graphics_family_index)
                        .queue_priorities(&queue_priorities),
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_family_index)
                        .queue_priorities(&queue_priorities),
                ]
            };

            let available_device_extensions = instance
                .enumerate_device_extension_properties(physical_device)
                .map_err(|e| engine_err!("prism3d::vulkan", "Failed to enumerate device extensions: {:?}", e))?;
            let device_extension_cstrings = Self::match_extensions(
                &available_device_extensions,
                &config.required_device_extensions,
                &config.requested_device_extensions,
                "device extension",
            )?;
            let device_extension_ptrs: Vec<*const std::ffi::c_char> =
                device_extension_cstrings.iter().map(|name| name.as_ptr()).collect();

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_ptrs);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!("prism3d::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);
            let present_queue = device.get_device_queue(present_family_index, 0);

            // Create GPU allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("prism3d::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let min_uniform_buffer_offset_alignment =
                properties.limits.min_uniform_buffer_offset_alignment;
            engine_debug!(
                "prism3d::vulkan",
                "Uniform buffer offset alignment: {} bytes",
                min_uniform_buffer_offset_alignment
            );

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                graphics_queue,
                graphics_queue_family: graphics_family_index,
                present_queue,
                present_queue_family: present_family_index,
                surface,
                surface_loader,
                min_uniform_buffer_offset_alignment,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                #[cfg(feature = "vulkan-validation")]
                debug_utils_loader,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
            })
        }
    }

    /// Match required and requested extension names against the available
    /// set. Missing required names are fatal; missing requested names are
    /// logged and skipped.
    fn match_extensions(
        available: &[vk::ExtensionProperties],
        required: &[String],
        requested: &[String],
        kind: &str,
    ) -> Result<Vec<CString>> {
        let is_available = |name: &str| {
            available.iter().any(|ext| {
                unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }
                    .to_str()
                    .map(|ext_name| ext_name == name)
                    .unwrap_or(false)
            })
        };

        let mut matched = Vec::with_capacity(required.len() + requested.len());
        for name in required {
            if !is_available(name) {
                engine_error!("prism3d::vulkan", "Required {} '{}' not available", kind, name);
                return Err(Error::InitializationFailed(format!(
                    "Required {} '{}' not available",
                    kind, name
                )));
            }
            if let Ok(cstring) = CString::new(name.clone()) {
                matched.push(cstring);
            }
        }
        for name in requested {
            if is_available(name) {
                if let Ok(cstring) = CString::new(name.clone()) {
                    matched.push(cstring);
                }
            } else {
                engine_warn!("prism3d::vulkan", "Requested {} '{}' not available, skipping", kind, name);
            }
        }
        Ok(matched)
    }

    /// Score devices by type and pick the highest-scoring one that has a
    /// graphics queue and can present to the surface.
    fn select_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        devices: &[vk::PhysicalDevice],
    ) -> Result<vk::PhysicalDevice> {
        let mut best: Option<(i32, vk::PhysicalDevice)> = None;
        for &device in devices {
            let score = Self::score_physical_device(instance, surface_loader, surface, device);
            if score >= 0 && best.map(|(s, _)| score > s).unwrap_or(true) {
                best = Some((score, device));
            }
        }
        best.map(|(_, device)| device).ok_or_else(|| {
            engine_error!("prism3d::vulkan", "No compatible Vulkan device available");
            Error::InitializationFailed("No compatible Vulkan device available".to_string())
        })
    }

    /// Device score: type preference, or -1 when unusable
    fn score_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        device: vk::PhysicalDevice,
    ) -> i32 {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(device) };

        let has_graphics = queue_families
            .iter()
            .any(|qf| qf.queue_count > 0 && qf.queue_flags.contains(vk::QueueFlags::GRAPHICS));
        let can_present = (0..queue_families.len() as u32).any(|i| {
            unsafe {
                surface_loader.get_physical_device_surface_support(device, i, surface)
            }
            .unwrap_or(false)
        });
        if !has_graphics || !can_present {
            return -1;
        }

        match properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 4000,
            vk::PhysicalDeviceType::VIRTUAL_GPU => 3000,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 2000,
            vk::PhysicalDeviceType::CPU => 1000,
            _ => 0,
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            // Allocator must release its memory blocks before the device
            // is destroyed
            ManuallyDrop::drop(&mut self.allocator);

            #[cfg(feature = "vulkan-validation")]
            if let (Some(loader), Some(messenger)) =
                (self.debug_utils_loader.as_ref(), self.debug_messenger.take())
            {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}
