// Platform seams
//
// The negotiation logic talks to the graphics API only through these two
// traits. `GpuInstance` and `AshDevice` implement them on top of ash; the
// test suite implements them with fixtures.

use ash::prelude::VkResult;
use ash::vk;
use std::ffi::CString;

/// Instance-level queries plus logical device creation
pub trait InstanceApi {
    type Device: DeviceApi;

    /// All adapters visible to the instance, in enumeration order
    fn enumerate_adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>>;

    /// Human-readable adapter name (for logs)
    fn adapter_name(&self, adapter: vk::PhysicalDevice) -> String;

    fn queue_families(&self, adapter: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;

    /// Whether queue family `family` can present to `surface`
    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;

    /// Device extension names advertised by the adapter
    fn device_extensions(&self, adapter: vk::PhysicalDevice) -> VkResult<Vec<CString>>;

    fn device_features(&self, adapter: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures;

    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;

    fn surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;

    fn surface_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;

    fn create_device(
        &self,
        adapter: vk::PhysicalDevice,
        request: &DeviceRequest,
    ) -> VkResult<Self::Device>;
}

/// Device-level object creation and destruction
///
/// Destroy calls must only be made once the handle is no longer in use;
/// the owners in this crate guarantee that through teardown order.
pub trait DeviceApi {
    fn queue(&self, family: u32, index: u32) -> vk::Queue;

    fn create_swapchain(&self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR>;

    /// Images owned by `swapchain`; the count may differ from the one requested
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    /// 2D colour view: identity swizzle, one mip level, one array layer
    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> VkResult<vk::ImageView>;

    fn destroy_image_view(&self, view: vk::ImageView);

    fn wait_idle(&self) -> VkResult<()>;

    /// Destroy the logical device itself. Called exactly once.
    fn destroy(&mut self);
}

/// Parameters for logical device creation
#[derive(Debug, Clone)]
pub struct DeviceRequest {
    /// Unique queue family indices, one queue each
    pub queue_families: Vec<u32>,
    pub queue_priority: f32,
    pub extensions: Vec<CString>,
    pub features: vk::PhysicalDeviceFeatures,
    /// Empty unless validation is enabled
    pub layers: Vec<CString>,
}

/// How swapchain images are shared between queue families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSharing {
    /// One family owns the images; no family list
    Exclusive,
    /// Concurrent access by exactly `[graphics, present]`
    Concurrent([u32; 2]),
}

impl ImageSharing {
    pub fn mode(&self) -> vk::SharingMode {
        match self {
            Self::Exclusive => vk::SharingMode::EXCLUSIVE,
            Self::Concurrent(_) => vk::SharingMode::CONCURRENT,
        }
    }

    pub fn family_indices(&self) -> &[u32] {
        match self {
            Self::Exclusive => &[],
            Self::Concurrent(families) => families,
        }
    }
}

/// Negotiated swapchain parameters
///
/// Single array layer, colour-attachment usage, opaque composite alpha and
/// clipping are fixed and applied by the platform implementation.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainDesc {
    pub surface: vk::SurfaceKHR,
    pub min_image_count: u32,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub sharing: ImageSharing,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
    /// Null unless rebuilding
    pub old_swapchain: vk::SwapchainKHR,
}
