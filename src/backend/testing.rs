// Fake platform for unit tests
//
// Adapters are plain fixtures; the fake device journals every create and
// destroy so tests can check ordering and leaks.

use super::platform::{DeviceApi, DeviceRequest, InstanceApi, SwapchainDesc};
use super::surface::FramebufferSize;
use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::Mutex;
use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Something the fake device did
#[derive(Debug, Clone)]
pub enum Event {
    QueueFetched { family: u32 },
    SwapchainCreated { handle: u64, desc: SwapchainDesc },
    SwapchainDestroyed(u64),
    ViewCreated(u64),
    ViewDestroyed(u64),
    DeviceIdle,
    DeviceDestroyed,
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    pub fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub fn views_created(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::ViewCreated(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    pub fn views_destroyed(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::ViewDestroyed(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    pub fn swapchains_created(&self) -> Vec<(u64, SwapchainDesc)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::SwapchainCreated { handle, desc } => Some((handle, desc)),
                _ => None,
            })
            .collect()
    }

    pub fn swapchains_destroyed(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::SwapchainDestroyed(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    /// Position of the first event matching `pred`
    pub fn position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events().iter().position(pred)
    }

    /// Every created view and swapchain has been destroyed
    pub fn assert_no_leaks(&self) {
        let mut created = self.views_created();
        let mut destroyed = self.views_destroyed();
        created.sort_unstable();
        destroyed.sort_unstable();
        assert_eq!(created, destroyed, "leaked image views");

        let mut chains: Vec<u64> = self.swapchains_created().into_iter().map(|(h, _)| h).collect();
        let mut gone = self.swapchains_destroyed();
        chains.sort_unstable();
        gone.sort_unstable();
        assert_eq!(chains, gone, "leaked swapchains");
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FakeFamily {
    pub graphics: bool,
    pub present: bool,
}

impl FakeFamily {
    pub const BOTH: Self = Self { graphics: true, present: true };
    pub const GRAPHICS: Self = Self { graphics: true, present: false };
    pub const PRESENT: Self = Self { graphics: false, present: true };
    pub const COMPUTE: Self = Self { graphics: false, present: false };
}

#[derive(Debug, Clone)]
pub struct FakeAdapter {
    pub name: String,
    pub families: Vec<FakeFamily>,
    pub extensions: Vec<CString>,
    pub features: vk::PhysicalDeviceFeatures,
    pub limits: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    /// Error returned by the extension query instead of the list
    pub extension_error: Option<vk::Result>,
    /// Error returned by every surface-support query
    pub support_error: Option<vk::Result>,
}

impl FakeAdapter {
    /// An adapter that meets the default requirements
    pub fn suitable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            families: vec![FakeFamily::BOTH],
            extensions: vec![c"VK_KHR_swapchain".to_owned()],
            features: vk::PhysicalDeviceFeatures {
                sampler_anisotropy: vk::TRUE,
                ..Default::default()
            },
            limits: limits(2, 0, vk::Extent2D { width: 800, height: 600 }),
            formats: vec![srgb_bgra()],
            present_modes: vec![vk::PresentModeKHR::FIFO],
            extension_error: None,
            support_error: None,
        }
    }

    pub fn families(mut self, families: &[FakeFamily]) -> Self {
        self.families = families.to_vec();
        self
    }

    pub fn without_extensions(mut self) -> Self {
        self.extensions.clear();
        self
    }

    pub fn without_anisotropy(mut self) -> Self {
        self.features.sampler_anisotropy = vk::FALSE;
        self
    }

    pub fn formats(mut self, formats: &[vk::SurfaceFormatKHR]) -> Self {
        self.formats = formats.to_vec();
        self
    }

    pub fn present_modes(mut self, modes: &[vk::PresentModeKHR]) -> Self {
        self.present_modes = modes.to_vec();
        self
    }

    pub fn limits(mut self, limits: vk::SurfaceCapabilitiesKHR) -> Self {
        self.limits = limits;
        self
    }

    pub fn failing_extension_query(mut self, result: vk::Result) -> Self {
        self.extension_error = Some(result);
        self
    }

    pub fn failing_support_query(mut self, result: vk::Result) -> Self {
        self.support_error = Some(result);
        self
    }
}

/// Fixture adapter list plus knobs for the device it creates
#[derive(Default)]
pub struct FakeInstance {
    pub adapters: Vec<FakeAdapter>,
    pub journal: Journal,
    pub fail_device: bool,
    pub fail_swapchain: bool,
    pub fail_view_at: Option<usize>,
    /// Images returned per swapchain; defaults to the requested count
    pub image_count: Option<usize>,
    pub support_queries: Cell<usize>,
    pub device_requests: RefCell<Vec<DeviceRequest>>,
}

impl FakeInstance {
    pub fn new(adapters: Vec<FakeAdapter>) -> Self {
        Self {
            adapters,
            ..Default::default()
        }
    }

    pub fn adapter_handle(index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(index as u64 + 1)
    }

    pub fn surface() -> vk::SurfaceKHR {
        vk::SurfaceKHR::from_raw(0x5afe)
    }

    fn adapter(&self, handle: vk::PhysicalDevice) -> &FakeAdapter {
        &self.adapters[handle.as_raw() as usize - 1]
    }

    /// A device wired to this instance's journal and failure knobs
    pub fn device(&self) -> FakeDevice {
        FakeDevice {
            journal: self.journal.clone(),
            next_handle: AtomicU64::new(0x1000),
            fail_swapchain: self.fail_swapchain,
            fail_view_at: self.fail_view_at,
            image_count: self.image_count,
            views_attempted: AtomicU64::new(0),
            last_requested: AtomicU64::new(0),
        }
    }
}

impl InstanceApi for FakeInstance {
    type Device = FakeDevice;

    fn enumerate_adapters(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        Ok((0..self.adapters.len()).map(Self::adapter_handle).collect())
    }

    fn adapter_name(&self, adapter: vk::PhysicalDevice) -> String {
        self.adapter(adapter).name.clone()
    }

    fn queue_families(&self, adapter: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        self.adapter(adapter)
            .families
            .iter()
            .map(|family| vk::QueueFamilyProperties {
                queue_flags: if family.graphics {
                    vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER
                } else {
                    vk::QueueFlags::COMPUTE
                },
                queue_count: 1,
                ..Default::default()
            })
            .collect()
    }

    fn surface_support(
        &self,
        adapter: vk::PhysicalDevice,
        family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        self.support_queries.set(self.support_queries.get() + 1);
        let adapter = self.adapter(adapter);
        match adapter.support_error {
            Some(result) => Err(result),
            None => Ok(adapter.families[family as usize].present),
        }
    }

    fn device_extensions(&self, adapter: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        let adapter = self.adapter(adapter);
        match adapter.extension_error {
            Some(result) => Err(result),
            None => Ok(adapter.extensions.clone()),
        }
    }

    fn device_features(&self, adapter: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        self.adapter(adapter).features
    }

    fn surface_capabilities(
        &self,
        adapter: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        Ok(self.adapter(adapter).limits)
    }

    fn surface_formats(
        &self,
        adapter: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.adapter(adapter).formats.clone())
    }

    fn surface_present_modes(
        &self,
        adapter: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        Ok(self.adapter(adapter).present_modes.clone())
    }

    fn create_device(
        &self,
        _adapter: vk::PhysicalDevice,
        request: &DeviceRequest,
    ) -> VkResult<FakeDevice> {
        self.device_requests.borrow_mut().push(request.clone());
        if self.fail_device {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        Ok(self.device())
    }
}

pub struct FakeDevice {
    pub journal: Journal,
    next_handle: AtomicU64,
    fail_swapchain: bool,
    fail_view_at: Option<usize>,
    image_count: Option<usize>,
    views_attempted: AtomicU64,
    last_requested: AtomicU64,
}

impl FakeDevice {
    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

impl DeviceApi for FakeDevice {
    fn queue(&self, family: u32, _index: u32) -> vk::Queue {
        self.journal.push(Event::QueueFetched { family });
        vk::Queue::from_raw(0x100 + family as u64)
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> VkResult<vk::SwapchainKHR> {
        if self.fail_swapchain {
            return Err(vk::Result::ERROR_SURFACE_LOST_KHR);
        }
        let handle = self.next();
        self.last_requested
            .store(desc.min_image_count as u64, Ordering::Relaxed);
        self.journal.push(Event::SwapchainCreated { handle, desc: *desc });
        Ok(vk::SwapchainKHR::from_raw(handle))
    }

    fn swapchain_images(&self, _swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        let count = self
            .image_count
            .unwrap_or(self.last_requested.load(Ordering::Relaxed) as usize);
        Ok((0..count).map(|_| vk::Image::from_raw(self.next())).collect())
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.journal.push(Event::SwapchainDestroyed(swapchain.as_raw()));
    }

    fn create_image_view(&self, _image: vk::Image, _format: vk::Format) -> VkResult<vk::ImageView> {
        let attempt = self.views_attempted.fetch_add(1, Ordering::Relaxed) as usize;
        if self.fail_view_at == Some(attempt) {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let handle = self.next();
        self.journal.push(Event::ViewCreated(handle));
        Ok(vk::ImageView::from_raw(handle))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.journal.push(Event::ViewDestroyed(view.as_raw()));
    }

    fn wait_idle(&self) -> VkResult<()> {
        self.journal.push(Event::DeviceIdle);
        Ok(())
    }

    fn destroy(&mut self) {
        self.journal.push(Event::DeviceDestroyed);
    }
}

/// Framebuffer of a fixed size that counts how often it was asked
pub struct FixedFramebuffer {
    pub width: u32,
    pub height: u32,
    pub queries: Cell<usize>,
}

impl FixedFramebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            queries: Cell::new(0),
        }
    }
}

impl FramebufferSize for FixedFramebuffer {
    fn framebuffer_size(&self) -> (u32, u32) {
        self.queries.set(self.queries.get() + 1);
        (self.width, self.height)
    }
}

pub fn srgb_bgra() -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
}

pub fn format(format: vk::Format) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
        format,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
}

pub fn limits(min: u32, max: u32, current: vk::Extent2D) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min,
        max_image_count: max,
        current_extent: current,
        min_image_extent: vk::Extent2D { width: 1, height: 1 },
        max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
        current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
        supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
        ..Default::default()
    }
}
