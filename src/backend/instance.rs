// Vulkan instance - entry point to the API
//
// Responsibilities:
// - Validation layer availability check
// - Instance creation (surface extensions + optional debug utils)
// - Debug messenger wiring to the injected sink
// - Surface creation/destruction for a window
// - InstanceApi queries on top of ash

use super::debug::{DebugMessenger, DiagnosticSink, SinkSlot};
use super::device::AshDevice;
use super::error::{ContextError, ContextResult};
use super::platform::{DeviceRequest, InstanceApi};
use super::requirements::ContextRequirements;
use ash::extensions::{ext::DebugUtils, khr::Surface};
use ash::prelude::VkResult;
use ash::{vk, Entry};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::{c_char, CStr, CString};
use std::sync::Arc;

/// Instance plus the surface loader and debug messenger hanging off it
pub struct GpuInstance {
    // Drop order is handled explicitly in Drop
    debug: Option<DebugMessenger>,
    surface_loader: Surface,
    instance: ash::Instance,
    entry: Entry,
    sink: Option<SinkSlot>,
}

impl GpuInstance {
    /// Create Vulkan instance
    ///
    /// # Arguments
    /// * `app_name` - Application name for debugging
    /// * `display` - Display the surfaces will live on (picks surface extensions)
    /// * `sink` - Validation message receiver; only used when validation is enabled
    pub fn new(
        app_name: &str,
        display: RawDisplayHandle,
        requirements: &ContextRequirements,
        sink: Arc<dyn DiagnosticSink>,
    ) -> ContextResult<Self> {
        log::info!("Creating Vulkan instance: {}", app_name);

        let entry = unsafe { Entry::load() }?;

        if requirements.enable_validation {
            check_validation_layer_support(&entry, &requirements.validation_layers)?;
        }

        let sink = requirements.enable_validation.then(|| SinkSlot::new(sink));
        let instance = Self::create_instance(&entry, app_name, display, requirements, sink.as_ref())?;

        let debug = match sink.as_ref() {
            Some(slot) => match DebugMessenger::new(&entry, &instance, slot) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            },
            None => None,
        };

        let surface_loader = Surface::new(&entry, &instance);

        Ok(Self {
            debug,
            surface_loader,
            instance,
            entry,
            sink,
        })
    }

    fn create_instance(
        entry: &Entry,
        app_name: &str,
        display: RawDisplayHandle,
        requirements: &ContextRequirements,
        sink: Option<&SinkSlot>,
    ) -> ContextResult<ash::Instance> {
        let app_name_cstr = CString::new(app_name).unwrap_or_else(|_| c"render-context".to_owned());
        let engine_name = c"No Engine";

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        // Platform-specific surface extensions
        let mut extensions = ash_window::enumerate_required_extensions(display)
            .map_err(ContextError::InstanceCreationFailed)?
            .to_vec();
        if sink.is_some() {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let layer_names: Vec<*const c_char> = requirements
            .active_layers()
            .iter()
            .map(|name| name.as_ptr())
            .collect();

        // Chained so instance creation and destruction are reported as well
        let mut debug_info = sink.map(SinkSlot::create_info);

        let mut create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names);
        if let Some(debug_info) = debug_info.as_mut() {
            create_info = create_info.push_next(debug_info);
        }

        unsafe { entry.create_instance(&create_info, None) }
            .map_err(ContextError::InstanceCreationFailed)
    }

    /// Create a presentable surface for a window
    pub fn create_surface(
        &self,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> ContextResult<vk::SurfaceKHR> {
        unsafe { ash_window::create_surface(&self.entry, &self.instance, display, window, None) }
            .map_err(ContextError::SurfaceCreationFailed)
    }

    /// Destroy a surface created by `create_surface`. Every swapchain built
    /// on it must already be gone.
    pub fn destroy_surface(&self, surface: vk::SurfaceKHR) {
        unsafe { self.surface_loader.destroy_surface(surface, None) }
    }
}

impl Drop for GpuInstance {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan instance...");

        // Messenger first; the sink slot must outlive the instance itself
        self.debug.take();
        unsafe { self.instance.destroy_instance(None) };
        self.sink.take();
    }
}

/// Every requested layer must be installed
fn check_validation_layer_support(entry: &Entry, layers: &[CString]) -> ContextResult<()> {
    let available = entry
        .enumerate_instance_layer_properties()
        .map_err(ContextError::query("instance layers"))?;

    for layer in layers {
        let found = available
            .iter()
            .any(|props| unsafe { CStr::from_ptr(props.layer_name.as_ptr()) } == layer.as_c_str());
        if !found {
            return Err(ContextError::ValidationLayerUnavailable(
                layer.to_string_lossy().into_owned(),
            ));
        }
    }

    Ok(())
}

impl InstanceApi for GpuInstance {
    type Device = AshDevice;

    fn enumerate_adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance.enumerate_physical_devices() }
    }

    fn adapter_name(&self, adapter: vk::PhysicalDevice) -> String {
        let properties = unsafe { self.instance.get_physical_device_properties(adapter) };
        unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    fn queue_families(&self, adapter: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        unsafe {
            self.instance
                .get_physical_device_queue_family_properties(adapter)
        }
    }

    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(adapter, family, surface)
        }
    }

    fn device_extensions(&self, adapter: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        let properties = unsafe { self.instance.enumerate_device_extension_properties(adapter) }?;
        Ok(properties
            .iter()
            .map(|props| unsafe { CStr::from_ptr(props.extension_name.as_ptr()) }.to_owned())
            .collect())
    }

    fn device_features(&self, adapter: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        unsafe { self.instance.get_physical_device_features(adapter) }
    }

    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(adapter, surface)
        }
    }

    fn surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(adapter, surface)
        }
    }

    fn surface_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(adapter, surface)
        }
    }

    fn create_device(
        &self,
        adapter: vk::PhysicalDevice,
        request: &DeviceRequest,
    ) -> VkResult<AshDevice> {
        AshDevice::create(&self.instance, adapter, request)
    }
}
