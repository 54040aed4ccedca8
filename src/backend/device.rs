// Logical device
//
// Responsibilities:
// - One queue-creation request per unique family (shared family => one queue)
// - Required extensions, features and (optionally) validation layers
// - Graphics + presentation queue handles
// - Idle + destroy on drop, after every dependent has gone

use super::adapter::SelectedAdapter;
use super::error::{ContextError, ContextResult};
use super::platform::{DeviceApi, DeviceRequest, InstanceApi, SwapchainDesc};
use super::queue_family::QueueFamilyLayout;
use super::requirements::ContextRequirements;
use ash::prelude::VkResult;
use ash::vk;
use std::ffi::c_char;

/// Logical device plus the two queues derived from it
///
/// Queues have no lifetime of their own. When both roles share a family the
/// two handles name the same hardware queue and must be treated as a single
/// submission domain.
pub struct DeviceContext<D: DeviceApi> {
    api: D,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    pub queue_families: QueueFamilyLayout,
}

impl<D: DeviceApi> DeviceContext<D> {
    /// Create the logical device for `adapter`
    pub fn new<I: InstanceApi<Device = D>>(
        instance: &I,
        adapter: &SelectedAdapter,
        requirements: &ContextRequirements,
    ) -> ContextResult<Self> {
        let request = Self::device_request(adapter.queue_families, requirements);

        log::info!(
            "Creating logical device on {} with queue families {:?}",
            adapter.name,
            request.queue_families
        );

        let api = instance
            .create_device(adapter.handle, &request)
            .map_err(ContextError::DeviceCreationFailed)?;

        let families = adapter.queue_families;
        let graphics_queue = api.queue(families.graphics, 0);
        let present_queue = if families.is_shared() {
            graphics_queue
        } else {
            api.queue(families.present, 0)
        };

        Ok(Self {
            api,
            graphics_queue,
            present_queue,
            queue_families: families,
        })
    }

    /// Everything the platform needs to build the device
    pub fn device_request(
        families: QueueFamilyLayout,
        requirements: &ContextRequirements,
    ) -> DeviceRequest {
        DeviceRequest {
            queue_families: families.unique(),
            queue_priority: 1.0,
            extensions: requirements.device_extensions.clone(),
            features: requirements.enabled_features(),
            layers: requirements.active_layers().to_vec(),
        }
    }

    pub fn api(&self) -> &D {
        &self.api
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> VkResult<()> {
        self.api.wait_idle()
    }
}

impl<D: DeviceApi> Drop for DeviceContext<D> {
    fn drop(&mut self) {
        log::info!("Destroying logical device...");

        if let Err(e) = self.api.wait_idle() {
            log::warn!("Device wait idle failed during teardown: {}", e);
        }
        self.api.destroy();
    }
}

/// ash-backed device
pub struct AshDevice {
    device: ash::Device,
    swapchain_loader: ash::extensions::khr::Swapchain,
}

impl AshDevice {
    pub fn create(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        request: &DeviceRequest,
    ) -> VkResult<Self> {
        let queue_priorities = [request.queue_priority];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = request
            .queue_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
                    .build()
            })
            .collect();

        let extensions: Vec<*const c_char> =
            request.extensions.iter().map(|name| name.as_ptr()).collect();
        let layers: Vec<*const c_char> = request.layers.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers)
            .enabled_features(&request.features);

        let device = unsafe { instance.create_device(physical_device, &create_info, None) }?;
        let swapchain_loader = ash::extensions::khr::Swapchain::new(instance, &device);

        Ok(Self {
            device,
            swapchain_loader,
        })
    }
}

impl DeviceApi for AshDevice {
    fn queue(&self, family: u32, index: u32) -> vk::Queue {
        unsafe { self.device.get_device_queue(family, index) }
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(desc.surface)
            .min_image_count(desc.min_image_count)
            .image_format(desc.format.format)
            .image_color_space(desc.format.color_space)
            .image_extent(desc.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(desc.sharing.mode())
            .queue_family_indices(desc.sharing.family_indices())
            .pre_transform(desc.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(desc.present_mode)
            .clipped(true)
            .old_swapchain(desc.old_swapchain);

        unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) }
    }

    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> VkResult<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
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

        unsafe { self.device.create_image_view(&create_info, None) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.device_wait_idle() }
    }

    fn destroy(&mut self) {
        unsafe { self.device.destroy_device(None) }
    }
}
