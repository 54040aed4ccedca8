// Backend module - GPU context negotiation
//
// Design: platform access sits behind `InstanceApi`/`DeviceApi`; selection
// and configuration logic is written against those traits only.

pub mod adapter;
pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod instance;
pub mod platform;
pub mod queue_family;
pub mod requirements;
pub mod surface;
pub mod swapchain;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{AdapterSelector, SelectedAdapter};
pub use context::{negotiate, rebuild_chain, RenderContext};
pub use debug::{DiagnosticSink, LogSink, Severity};
pub use device::{AshDevice, DeviceContext};
pub use error::{ContextError, ContextResult};
pub use instance::GpuInstance;
pub use queue_family::{QueueFamilyIndices, QueueFamilyLayout};
pub use requirements::{ContextRequirements, DeviceFeature};
pub use surface::{FramebufferSize, SurfaceCapabilities};
pub use swapchain::{PresentationChain, SwapchainPreferences};
