// Context errors
//
// Every variant is fatal to context acquisition: callers propagate, they
// never retry. Handles created before the failure are released first.

use ash::vk;
use thiserror::Error;

/// Failures raised while acquiring or tearing down the GPU context
#[derive(Error, Debug)]
pub enum ContextError {
    /// The Vulkan loader library could not be found or opened
    #[error("Failed to load Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("Instance creation failed: {0}")]
    InstanceCreationFailed(vk::Result),

    /// A requested validation layer is not installed
    #[error("Validation layer {0} requested, but not available")]
    ValidationLayerUnavailable(String),

    #[error("Debug messenger setup failed: {0}")]
    DebugMessengerFailed(vk::Result),

    #[error("Surface creation failed: {0}")]
    SurfaceCreationFailed(vk::Result),

    /// Adapter enumeration returned nothing
    #[error("No Vulkan-capable GPU found")]
    NoAdaptersFound,

    /// Adapters exist, but none satisfies every requirement
    #[error("No suitable GPU found")]
    NoSuitableAdapter,

    #[error("Logical device creation failed: {0}")]
    DeviceCreationFailed(vk::Result),

    #[error("Swapchain creation failed: {0}")]
    SwapchainCreationFailed(vk::Result),

    /// View creation for swapchain image `index` was rejected
    #[error("Failed to create view for swapchain image {index}: {result}")]
    ImageViewCreationFailed { index: usize, result: vk::Result },

    /// A failed rebuild already released the chain
    #[error("Presentation chain is gone after a failed rebuild")]
    PresentationChainLost,

    /// A capability or handle query failed outright
    #[error("Failed to query {what}: {result}")]
    Query {
        what: &'static str,
        result: vk::Result,
    },
}

impl ContextError {
    /// Wrap a failed platform query
    pub fn query(what: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Query { what, result }
    }
}

/// Result type for context operations
pub type ContextResult<T> = Result<T, ContextError>;
