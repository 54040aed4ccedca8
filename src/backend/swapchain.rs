// Swapchain - Window presentation
//
// Negotiates format, present mode, extent, image count and sharing against
// the probed surface capabilities, then owns the chain handle and one view
// per image. Images belong to the chain handle; views belong to us and go
// first on teardown.

use super::device::DeviceContext;
use super::error::{ContextError, ContextResult};
use super::platform::{DeviceApi, SwapchainDesc};
use super::surface::{FramebufferSize, SurfaceCapabilities};
use ash::vk;
use std::sync::Arc;

/// What we would like, if the surface offers it
#[derive(Debug, Clone, Copy)]
pub struct SwapchainPreferences {
    pub format: vk::SurfaceFormatKHR,
    /// Low-latency mode to look for; FIFO is the fallback
    pub present_mode: vk::PresentModeKHR,
}

impl Default for SwapchainPreferences {
    fn default() -> Self {
        Self {
            format: vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            present_mode: vk::PresentModeKHR::MAILBOX,
        }
    }
}

/// Exact (format, colour space) match, else the first entry. `None` only
/// for an empty list.
pub fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    preferred: vk::SurfaceFormatKHR,
) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| f.format == preferred.format && f.color_space == preferred.color_space)
        .or_else(|| formats.first())
        .copied()
}

pub fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    preferred: vk::PresentModeKHR,
) -> vk::PresentModeKHR {
    modes
        .iter()
        .copied()
        .find(|&mode| mode == preferred)
        .unwrap_or(vk::PresentModeKHR::FIFO) // FIFO is always supported
}

/// A current extent of `u32::MAX` means the surface size follows the
/// swapchain; only then is the framebuffer consulted.
pub fn choose_extent<F: FramebufferSize + ?Sized>(
    limits: &vk::SurfaceCapabilitiesKHR,
    framebuffer: &F,
) -> vk::Extent2D {
    if limits.current_extent.width != u32::MAX {
        return limits.current_extent;
    }

    let (width, height) = framebuffer.framebuffer_size();
    vk::Extent2D {
        width: width.clamp(limits.min_image_extent.width, limits.max_image_extent.width),
        height: height.clamp(limits.min_image_extent.height, limits.max_image_extent.height),
    }
}

/// One more than the minimum; a maximum of 0 means unbounded
pub fn choose_image_count(limits: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut image_count = limits.min_image_count + 1;
    if limits.max_image_count > 0 && image_count > limits.max_image_count {
        image_count = limits.max_image_count;
    }
    image_count
}

/// One view per image. A failure releases the views already made.
fn create_image_views<D: DeviceApi>(
    api: &D,
    images: &[vk::Image],
    format: vk::Format,
) -> ContextResult<Vec<vk::ImageView>> {
    let mut views = Vec::with_capacity(images.len());

    for (index, &image) in images.iter().enumerate() {
        match api.create_image_view(image, format) {
            Ok(view) => views.push(view),
            Err(result) => {
                for view in views.drain(..).rev() {
                    api.destroy_image_view(view);
                }
                return Err(ContextError::ImageViewCreationFailed { index, result });
            }
        }
    }

    Ok(views)
}

/// Swapchain handle, its images and their views
///
/// Holds the device alive, so the device can never be destroyed under it.
pub struct PresentationChain<D: DeviceApi> {
    device: Arc<DeviceContext<D>>,
    surface: vk::SurfaceKHR,
    preferences: SwapchainPreferences,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
}

impl<D: DeviceApi> PresentationChain<D> {
    pub fn new<F: FramebufferSize + ?Sized>(
        device: Arc<DeviceContext<D>>,
        surface: vk::SurfaceKHR,
        capabilities: &SurfaceCapabilities,
        preferences: SwapchainPreferences,
        framebuffer: &F,
    ) -> ContextResult<Self> {
        Self::build(
            device,
            surface,
            capabilities,
            preferences,
            framebuffer,
            vk::SwapchainKHR::null(),
        )
    }

    /// Replace this chain for new capabilities (e.g. after a resize)
    ///
    /// The new chain is created with the old one as hint; the old views and
    /// handle are released afterwards. The old chain is retired by the
    /// platform either way, so it is released on failure too.
    pub fn rebuild<F: FramebufferSize + ?Sized>(
        self,
        capabilities: &SurfaceCapabilities,
        framebuffer: &F,
    ) -> ContextResult<Self> {
        log::info!("Rebuilding swapchain");

        let rebuilt = Self::build(
            self.device.clone(),
            self.surface,
            capabilities,
            self.preferences,
            framebuffer,
            self.swapchain,
        );

        if let Err(e) = self.device.wait_idle() {
            log::warn!("Device wait idle failed before releasing old swapchain: {}", e);
        }
        drop(self);

        rebuilt
    }

    fn build<F: FramebufferSize + ?Sized>(
        device: Arc<DeviceContext<D>>,
        surface: vk::SurfaceKHR,
        capabilities: &SurfaceCapabilities,
        preferences: SwapchainPreferences,
        framebuffer: &F,
        old_swapchain: vk::SwapchainKHR,
    ) -> ContextResult<Self> {
        let format = choose_surface_format(&capabilities.formats, preferences.format)
            .ok_or(ContextError::SwapchainCreationFailed(vk::Result::ERROR_FORMAT_NOT_SUPPORTED))?;
        let present_mode = choose_present_mode(&capabilities.present_modes, preferences.present_mode);
        let extent = choose_extent(&capabilities.limits, framebuffer);
        let image_count = choose_image_count(&capabilities.limits);

        log::info!(
            "Creating swapchain: {}x{}, {:?}/{:?}, {:?}, {} images requested",
            extent.width,
            extent.height,
            format.format,
            format.color_space,
            present_mode,
            image_count
        );

        let desc = SwapchainDesc {
            surface,
            min_image_count: image_count,
            format,
            extent,
            sharing: device.queue_families.image_sharing(),
            pre_transform: capabilities.limits.current_transform,
            present_mode,
            old_swapchain,
        };

        let api = device.api();
        let swapchain = api
            .create_swapchain(&desc)
            .map_err(ContextError::SwapchainCreationFailed)?;

        let images = match api.swapchain_images(swapchain) {
            Ok(images) => images,
            Err(result) => {
                api.destroy_swapchain(swapchain);
                return Err(ContextError::query("swapchain images")(result));
            }
        };

        let image_views = match create_image_views(api, &images, format.format) {
            Ok(views) => views,
            Err(e) => {
                api.destroy_swapchain(swapchain);
                return Err(e);
            }
        };

        log::info!("Created swapchain with {} images", images.len());

        Ok(Self {
            device,
            surface,
            preferences,
            swapchain,
            images,
            image_views,
            format,
            present_mode,
            extent,
        })
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Owned by the chain handle; valid only while `self` lives
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub fn device(&self) -> &Arc<DeviceContext<D>> {
        &self.device
    }
}

impl<D: DeviceApi> Drop for PresentationChain<D> {
    fn drop(&mut self) {
        let api = self.device.api();
        for view in self.image_views.drain(..) {
            api.destroy_image_view(view);
        }
        api.destroy_swapchain(self.swapchain);
    }
}
