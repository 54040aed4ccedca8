// Render context - owns the whole negotiated GPU stack
//
// Creation:  instance -> messenger -> surface -> adapter -> device -> chain
// Teardown:  views -> chain -> device -> surface -> messenger -> instance
//
// Any failure aborts the sequence; whatever was already created is released
// in reverse order before the error propagates.

use super::adapter::{AdapterSelector, SelectedAdapter};
use super::debug::DiagnosticSink;
use super::device::{AshDevice, DeviceContext};
use super::error::{ContextError, ContextResult};
use super::instance::GpuInstance;
use super::platform::{DeviceApi, InstanceApi};
use super::requirements::ContextRequirements;
use super::surface::{FramebufferSize, SurfaceCapabilities};
use super::swapchain::{PresentationChain, SwapchainPreferences};
use ash::vk;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use std::sync::Arc;

/// Result of a successful negotiation on an existing instance + surface
pub struct Negotiated<D: DeviceApi> {
    pub adapter: SelectedAdapter,
    pub chain: PresentationChain<D>,
}

/// Select an adapter, create the device, then build the presentation chain
///
/// The device is handed to the chain, which keeps it alive; dropping the
/// chain releases views, the chain handle and then the device.
pub fn negotiate<I: InstanceApi, F: FramebufferSize + ?Sized>(
    instance: &I,
    surface: vk::SurfaceKHR,
    requirements: &ContextRequirements,
    preferences: SwapchainPreferences,
    framebuffer: &F,
) -> ContextResult<Negotiated<I::Device>> {
    let adapter = AdapterSelector::new(requirements).select(instance, surface)?;
    let device = Arc::new(DeviceContext::new(instance, &adapter, requirements)?);
    let capabilities = SurfaceCapabilities::probe(instance, adapter.handle, surface)?;
    let chain = PresentationChain::new(device, surface, &capabilities, preferences, framebuffer)?;

    Ok(Negotiated { adapter, chain })
}

/// Re-probe the surface and replace `chain` with one sized for `framebuffer`
///
/// A failed rebuild leaves `chain` empty; every later call then fails with
/// `PresentationChainLost`.
pub fn rebuild_chain<I: InstanceApi, F: FramebufferSize + ?Sized>(
    instance: &I,
    adapter: &SelectedAdapter,
    surface: vk::SurfaceKHR,
    chain: &mut Option<PresentationChain<I::Device>>,
    framebuffer: &F,
) -> ContextResult<()> {
    if chain.is_none() {
        return Err(ContextError::PresentationChainLost);
    }

    let capabilities = SurfaceCapabilities::probe(instance, adapter.handle, surface)?;
    if let Some(old) = chain.take() {
        *chain = Some(old.rebuild(&capabilities, framebuffer)?);
    }
    Ok(())
}

/// Everything the render loop needs, torn down in the right order on drop
pub struct RenderContext {
    chain: Option<PresentationChain<AshDevice>>,
    adapter: SelectedAdapter,
    surface: vk::SurfaceKHR,
    instance: GpuInstance,
}

impl RenderContext {
    /// Initialize all Vulkan resources for `window`
    ///
    /// `sink` receives validation messages when validation is enabled.
    pub fn new<W>(
        app_name: &str,
        window: &W,
        requirements: &ContextRequirements,
        preferences: SwapchainPreferences,
        sink: Arc<dyn DiagnosticSink>,
    ) -> ContextResult<Self>
    where
        W: HasRawDisplayHandle + HasRawWindowHandle + FramebufferSize,
    {
        log::info!("Initializing Vulkan...");

        let display = window.raw_display_handle();
        let instance = GpuInstance::new(app_name, display, requirements, sink)?;
        let surface = instance.create_surface(display, window.raw_window_handle())?;

        match negotiate(&instance, surface, requirements, preferences, window) {
            Ok(Negotiated { adapter, chain }) => {
                log::info!("Vulkan initialized successfully!");
                Ok(Self {
                    chain: Some(chain),
                    adapter,
                    surface,
                    instance,
                })
            }
            Err(e) => {
                instance.destroy_surface(surface);
                Err(e)
            }
        }
    }

    /// Rebuild the presentation chain for the current window size
    ///
    /// On failure the context is left without a chain and later calls
    /// return `PresentationChainLost`; callers treat that as fatal.
    pub fn rebuild_presentation<F: FramebufferSize + ?Sized>(
        &mut self,
        framebuffer: &F,
    ) -> ContextResult<()> {
        rebuild_chain(
            &self.instance,
            &self.adapter,
            self.surface,
            &mut self.chain,
            framebuffer,
        )
    }

    pub fn adapter(&self) -> &SelectedAdapter {
        &self.adapter
    }

    pub fn chain(&self) -> Option<&PresentationChain<AshDevice>> {
        self.chain.as_ref()
    }

    pub fn device(&self) -> Option<&Arc<DeviceContext<AshDevice>>> {
        self.chain.as_ref().map(PresentationChain::device)
    }

    pub fn graphics_queue(&self) -> Option<vk::Queue> {
        self.device().map(|device| device.graphics_queue)
    }

    pub fn present_queue(&self) -> Option<vk::Queue> {
        self.device().map(|device| device.present_queue)
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        if let Some(device) = self.device() {
            if let Err(e) = device.wait_idle() {
                log::warn!("Device wait idle failed during teardown: {}", e);
            }
        }

        // Chain owns the last device reference: views, chain, then device
        self.chain.take();
        self.instance.destroy_surface(self.surface);
        // GpuInstance drops next: messenger, then instance
    }
}
