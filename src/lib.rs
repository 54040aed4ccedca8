// Render context - GPU adapter, device and swapchain negotiation
//
// The library owns acquiring and tearing down the GPU context; windowing
// and the render loop live with the caller.

pub mod backend;
pub mod config;

pub use backend::{ContextError, ContextRequirements, RenderContext, SwapchainPreferences};
pub use config::Config;
