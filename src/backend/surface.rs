// Surface capability probe
//
// Snapshot of what an adapter can do with a surface. Re-probed whenever the
// surface or adapter changes (resize included); never edited in place.

use super::error::{ContextError, ContextResult};
use super::platform::InstanceApi;
use ash::vk;

/// Live framebuffer size of the window behind a surface
///
/// Queried on demand during extent selection, never cached.
pub trait FramebufferSize {
    fn framebuffer_size(&self) -> (u32, u32);
}

impl FramebufferSize for winit::window::Window {
    fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}

/// Limits, formats and present modes for one adapter+surface pair
#[derive(Debug, Clone)]
pub struct SurfaceCapabilities {
    pub limits: vk::SurfaceCapabilitiesKHR,
    /// Platform order is preserved
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceCapabilities {
    pub fn probe<I: InstanceApi>(
        api: &I,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> ContextResult<Self> {
        let limits = api
            .surface_capabilities(adapter, surface)
            .map_err(ContextError::query("surface capabilities"))?;
        let formats = api
            .surface_formats(adapter, surface)
            .map_err(ContextError::query("surface formats"))?;
        let present_modes = api
            .surface_present_modes(adapter, surface)
            .map_err(ContextError::query("surface present modes"))?;

        Ok(Self {
            limits,
            formats,
            present_modes,
        })
    }

    /// Necessary (not sufficient) for presenting: at least one format and
    /// one present mode
    pub fn is_presentable(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}
