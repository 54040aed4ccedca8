// Requirements - what the application demands of an adapter
//
// Injected into AdapterSelector and DeviceContext instead of living in
// globals, so alternate requirement sets can be tested.

use ash::vk;
use std::collections::BTreeSet;
use std::ffi::{CStr, CString};
use std::fmt;

/// Validation layer enabled when diagnostics are on
pub const KHRONOS_VALIDATION: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Hardware features an application can insist on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFeature {
    SamplerAnisotropy,
    FillModeNonSolid,
    WideLines,
}

impl DeviceFeature {
    pub fn is_supported(self, features: &vk::PhysicalDeviceFeatures) -> bool {
        let flag = match self {
            Self::SamplerAnisotropy => features.sampler_anisotropy,
            Self::FillModeNonSolid => features.fill_mode_non_solid,
            Self::WideLines => features.wide_lines,
        };
        flag == vk::TRUE
    }

    pub fn enable(self, features: &mut vk::PhysicalDeviceFeatures) {
        match self {
            Self::SamplerAnisotropy => features.sampler_anisotropy = vk::TRUE,
            Self::FillModeNonSolid => features.fill_mode_non_solid = vk::TRUE,
            Self::WideLines => features.wide_lines = vk::TRUE,
        }
    }
}

impl fmt::Display for DeviceFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SamplerAnisotropy => "samplerAnisotropy",
            Self::FillModeNonSolid => "fillModeNonSolid",
            Self::WideLines => "wideLines",
        };
        f.write_str(name)
    }
}

/// Extensions, layers and features the context must be built with
#[derive(Debug, Clone)]
pub struct ContextRequirements {
    pub device_extensions: Vec<CString>,
    pub validation_layers: Vec<CString>,
    pub features: Vec<DeviceFeature>,
    /// Enables the validation layers and the debug messenger
    pub enable_validation: bool,
}

impl Default for ContextRequirements {
    fn default() -> Self {
        Self {
            device_extensions: vec![ash::extensions::khr::Swapchain::name().to_owned()],
            validation_layers: vec![KHRONOS_VALIDATION.to_owned()],
            features: vec![DeviceFeature::SamplerAnisotropy],
            enable_validation: cfg!(debug_assertions),
        }
    }
}

impl ContextRequirements {
    pub fn with_validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Feature set to enable on the logical device
    pub fn enabled_features(&self) -> vk::PhysicalDeviceFeatures {
        let mut enabled = vk::PhysicalDeviceFeatures::default();
        for feature in &self.features {
            feature.enable(&mut enabled);
        }
        enabled
    }

    /// Required features the adapter lacks
    pub fn missing_features(&self, available: &vk::PhysicalDeviceFeatures) -> Vec<DeviceFeature> {
        self.features
            .iter()
            .copied()
            .filter(|feature| !feature.is_supported(available))
            .collect()
    }

    /// Layers to enable at instance and device level
    pub fn active_layers(&self) -> &[CString] {
        if self.enable_validation {
            &self.validation_layers
        } else {
            &[]
        }
    }
}

/// Required names not present in `available`
pub fn missing_extensions<'a>(required: &'a [CString], available: &[CString]) -> Vec<&'a CStr> {
    let mut remaining: BTreeSet<&CStr> = required.iter().map(CString::as_c_str).collect();
    for extension in available {
        remaining.remove(extension.as_c_str());
    }
    remaining.into_iter().collect()
}

/// True iff every required extension is advertised
pub fn extensions_supported(required: &[CString], available: &[CString]) -> bool {
    missing_extensions(required, available).is_empty()
}
