// Validation message channel
//
// The debug messenger forwards validation output to an injected sink. Only
// the top-level context wires it up; device and swapchain code never see it.

use super::error::{ContextError, ContextResult};
use ash::extensions::ext::DebugUtils;
use ash::vk;
use std::ffi::{c_void, CStr};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
}

impl From<vk::DebugUtilsMessageSeverityFlagsEXT> for Severity {
    fn from(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Self::Error
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Self::Warning
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Self::Info
        } else {
            Self::Verbose
        }
    }
}

/// Receiver for validation messages; may be called from any thread
pub trait DiagnosticSink: Send + Sync {
    fn message(&self, severity: Severity, text: &str);
}

/// Routes validation messages into the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn message(&self, severity: Severity, text: &str) {
        match severity {
            Severity::Error => log::error!("[Vulkan] {}", text),
            Severity::Warning => log::warn!("[Vulkan] {}", text),
            Severity::Info => log::debug!("[Vulkan] {}", text),
            Severity::Verbose => log::trace!("[Vulkan] {}", text),
        }
    }
}

/// Boxed sink whose address is handed to the driver as user data
pub(crate) struct SinkSlot(Box<Arc<dyn DiagnosticSink>>);

impl SinkSlot {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self(Box::new(sink))
    }

    /// Create-info pointing at this slot. The slot must outlive every
    /// messenger (or instance) created from it.
    pub fn create_info(&self) -> vk::DebugUtilsMessengerCreateInfoEXT {
        let user_data = &*self.0 as *const Arc<dyn DiagnosticSink> as *mut c_void;
        vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback))
            .user_data(user_data)
            .build()
    }
}

/// Persistent messenger; must be dropped before the instance
pub struct DebugMessenger {
    loader: DebugUtils,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    pub(crate) fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        slot: &SinkSlot,
    ) -> ContextResult<Self> {
        let loader = DebugUtils::new(entry, instance);
        let create_info = slot.create_info();

        let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None) }
            .map_err(ContextError::DebugMessengerFailed)?;

        Ok(Self { loader, messenger })
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        unsafe {
            self.loader
                .destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    p_user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || p_user_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }

    let sink = &*(p_user_data as *const Arc<dyn DiagnosticSink>);
    let message = CStr::from_ptr((*p_callback_data).p_message);
    sink.message(Severity::from(message_severity), &message.to_string_lossy());

    vk::FALSE
}
