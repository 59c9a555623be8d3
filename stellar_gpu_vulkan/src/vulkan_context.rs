/// VulkanContext - instance, surface, logical device and allocator
///
/// Built once from a `Context` and a `Platform`. Owns everything whose
/// lifetime spans the whole device: the loaders, the presentation surface, the
/// queues, the command pool every frame allocates from and the gpu-allocator
/// instance. Destruction runs in reverse creation order in `Drop`.

use std::mem::ManuallyDrop;
use std::sync::Mutex;

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use stellar_gpu::graphics_device::QueueFamilyIndices;
use stellar_gpu::{engine_debug, engine_error, engine_info, engine_warn};
use stellar_gpu::{Context, Error, Log, Platform, Result};

#[cfg(feature = "vulkan-validation")]
use crate::debug::{self, DebugState};

const SOURCE: &str = "stellar::vulkan";

#[cfg(feature = "vulkan-validation")]
const VALIDATION_LAYER: &std::ffi::CStr = c"VK_LAYER_KHRONOS_validation";

/// Log an initialization failure and build the matching error
fn init_error(log: &Log, message: String) -> Error {
    engine_error!(log, SOURCE, "{}", message);
    Error::InitializationFailed(message)
}

/// Validation messenger and the state its callback reads
#[cfg(feature = "vulkan-validation")]
pub(crate) struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
    /// Boxed so the address given to the driver stays stable
    pub(crate) state: Box<DebugState>,
}

pub(crate) struct VulkanContext {
    _entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    #[cfg(feature = "vulkan-validation")]
    pub(crate) debug: Option<DebugMessenger>,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) surface: vk::SurfaceKHR,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,
    pub(crate) queue_families: QueueFamilyIndices,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) present_queue: vk::Queue,
    /// Pool for per-frame command buffers (RESET_COMMAND_BUFFER)
    pub(crate) command_pool: Mutex<vk::CommandPool>,
    /// Dropped before the device is destroyed
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,
}

impl VulkanContext {
    pub(crate) fn new(ctx: &Context, platform: &dyn Platform) -> Result<Self> {
        let log = ctx.log();
        let config = ctx.config();
        let native = platform.native_handle()?;

        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_error(log, format!("Failed to load Vulkan library: {:?}", e)))?;

            let app_name = std::ffi::CString::new(config.app_name.as_str())
                .map_err(|e| init_error(log, format!("Invalid application name: {}", e)))?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Stellar")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            #[allow(unused_mut)]
            let mut extension_names = ash_window::enumerate_required_extensions(native.display)
                .map_err(|e| init_error(log, format!("Failed to get required extensions: {:?}", e)))?
                .to_vec();
            #[allow(unused_mut)]
            let mut layer_names: Vec<*const std::os::raw::c_char> = Vec::new();

            #[cfg(feature = "vulkan-validation")]
            let validation = config.enable_validation && Self::validation_layer_available(&entry, log);
            #[cfg(feature = "vulkan-validation")]
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(VALIDATION_LAYER.as_ptr());
            }
            #[cfg(not(feature = "vulkan-validation"))]
            if config.enable_validation {
                engine_warn!(log, SOURCE,
                    "Validation requested but the backend was built without 'vulkan-validation'");
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_error(log, format!("Failed to create Vulkan instance: {:?}", e)))?;

            // Declared before `partial` so the messenger state outlives its teardown
            #[cfg(feature = "vulkan-validation")]
            let debug: Option<DebugMessenger>;

            // From here on, partially built state is torn down by `Partial`
            let mut partial = Partial::default();
            partial.instance = Some(instance.clone());

            #[cfg(feature = "vulkan-validation")]
            {
                debug = if validation {
                    let messenger = Self::create_debug_messenger(&entry, &instance, ctx)?;
                    partial.debug = Some((messenger.loader.clone(), messenger.messenger));
                    Some(messenger)
                } else {
                    None
                };
            }

            let surface = ash_window::create_surface(&entry, &instance, native.display, native.window, None)
                .map_err(|e| init_error(log, format!("Failed to create surface: {:?}", e)))?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            partial.surface = Some((surface_loader.clone(), surface));

            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| init_error(log, format!("Failed to enumerate physical devices: {:?}", e)))?;

            let (physical_device, queue_families) = physical_devices
                .into_iter()
                .find_map(|pd| {
                    Self::find_queue_families(&instance, &surface_loader, surface, pd).map(|q| (pd, q))
                })
                .ok_or_else(|| {
                    init_error(log, "No GPU with graphics and present support found".to_string())
                })?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "Unknown".to_string());
            engine_info!(log, SOURCE,
                "Using GPU '{}' (graphics family {}, present family {})",
                device_name, queue_families.graphics, queue_families.present);

            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_families.graphics)
                .queue_priorities(&queue_priorities)];
            if queue_families.present != queue_families.graphics {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(queue_families.present)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_features = vk::PhysicalDeviceFeatures::default();
            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_error(log, format!("Failed to create logical device: {:?}", e)))?;
            partial.device = Some(device.clone());

            let graphics_queue = device.get_device_queue(queue_families.graphics, 0);
            let present_queue = device.get_device_queue(queue_families.present, 0);
            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_families.graphics)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = device
                .create_command_pool(&pool_info, None)
                .map_err(|e| init_error(log, format!("Failed to create command pool: {:?}", e)))?;
            partial.command_pool = Some(command_pool);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_error(log, format!("Failed to create GPU allocator: {:?}", e)))?;

            // Fully built: ownership moves to the context
            std::mem::forget(partial);
            engine_debug!(log, SOURCE, "Vulkan device ready");

            Ok(Self {
                _entry: entry,
                instance,
                #[cfg(feature = "vulkan-validation")]
                debug,
                surface_loader,
                surface,
                physical_device,
                device,
                swapchain_loader,
                queue_families,
                graphics_queue,
                present_queue,
                command_pool: Mutex::new(command_pool),
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
            })
        }
    }

    /// First graphics family, and a present family (preferring the same one)
    unsafe fn find_queue_families(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
    ) -> Option<QueueFamilyIndices> {
        let families = instance.get_physical_device_queue_family_properties(physical_device);
        let supports_present = |index: u32| {
            surface_loader
                .get_physical_device_surface_support(physical_device, index, surface)
                .unwrap_or(false)
        };

        let graphics = families
            .iter()
            .enumerate()
            .find(|(_, family)| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|(i, _)| i as u32)?;
        let present = if supports_present(graphics) {
            graphics
        } else {
            (0..families.len() as u32).find(|&i| supports_present(i))?
        };
        Some(QueueFamilyIndices { graphics, present })
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn validation_layer_available(entry: &ash::Entry, log: &Log) -> bool {
        let available = entry
            .enumerate_instance_layer_properties()
            .map(|layers| {
                layers.iter().any(|layer| {
                    layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER)
                })
            })
            .unwrap_or(false);
        if !available {
            engine_warn!(log, SOURCE,
                "Validation layer {:?} not installed, continuing without validation",
                VALIDATION_LAYER);
        }
        available
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        ctx: &Context,
    ) -> Result<DebugMessenger> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let state = Box::new(DebugState::new(ctx.config()));

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(debug::severity_flags(state.severity()))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug::vulkan_debug_callback))
            .user_data(&*state as *const DebugState as *mut std::ffi::c_void);

        let messenger = loader
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| init_error(ctx.log(), format!("Failed to create debug messenger: {:?}", e)))?;
        engine_debug!(ctx.log(), SOURCE, "Validation enabled ({:?})", state.severity());

        Ok(DebugMessenger { loader, messenger, state })
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            if let Ok(pool) = self.command_pool.get_mut() {
                self.device.destroy_command_pool(*pool, None);
            }

            // Frees the allocator's memory blocks while the device is alive
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);

            #[cfg(feature = "vulkan-validation")]
            if let Some(debug) = self.debug.take() {
                debug.loader.destroy_debug_utils_messenger(debug.messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Objects created so far by `VulkanContext::new`, destroyed on early return
#[derive(Default)]
struct Partial {
    instance: Option<ash::Instance>,
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface: Option<(ash::khr::surface::Instance, vk::SurfaceKHR)>,
    device: Option<ash::Device>,
    command_pool: Option<vk::CommandPool>,
}

impl Drop for Partial {
    fn drop(&mut self) {
        unsafe {
            if let Some(device) = &self.device {
                if let Some(pool) = self.command_pool {
                    device.destroy_command_pool(pool, None);
                }
                device.destroy_device(None);
            }
            if let Some((loader, surface)) = &self.surface {
                loader.destroy_surface(*surface, None);
            }
            if let Some((loader, messenger)) = &self.debug {
                loader.destroy_debug_utils_messenger(*messenger, None);
            }
            if let Some(instance) = &self.instance {
                instance.destroy_instance(None);
            }
        }
    }
}
