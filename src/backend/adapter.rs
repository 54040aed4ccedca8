// Adapter selection
//
// First adapter in enumeration order that passes every check wins. There is
// no scoring: a later, "better" adapter never displaces an earlier suitable one.

use super::error::{ContextError, ContextResult};
use super::platform::InstanceApi;
use super::queue_family::{QueueFamilyIndices, QueueFamilyLayout};
use super::requirements::{missing_extensions, ContextRequirements, DeviceFeature};
use super::surface::SurfaceCapabilities;
use ash::vk;
use std::fmt;

/// The adapter chosen for this run, with its resolved queue families
#[derive(Debug, Clone)]
pub struct SelectedAdapter {
    pub handle: vk::PhysicalDevice,
    /// Position in the enumeration
    pub index: usize,
    pub name: String,
    pub queue_families: QueueFamilyLayout,
}

/// Why an adapter was passed over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    IncompleteQueueFamilies(QueueFamilyIndices),
    MissingExtensions(Vec<String>),
    NotPresentable,
    MissingFeatures(Vec<DeviceFeature>),
    /// A platform query on this adapter failed
    QueryFailed {
        what: &'static str,
        result: vk::Result,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompleteQueueFamilies(indices) => write!(
                f,
                "no complete queue families (graphics: {:?}, present: {:?})",
                indices.graphics, indices.present
            ),
            Self::MissingExtensions(names) => write!(f, "missing extensions {}", names.join(", ")),
            Self::NotPresentable => f.write_str("no surface formats or present modes"),
            Self::MissingFeatures(features) => {
                let names: Vec<String> = features.iter().map(ToString::to_string).collect();
                write!(f, "missing features {}", names.join(", "))
            }
            Self::QueryFailed { what, result } => write!(f, "failed to query {}: {}", what, result),
        }
    }
}

pub struct AdapterSelector<'a> {
    requirements: &'a ContextRequirements,
}

impl<'a> AdapterSelector<'a> {
    pub fn new(requirements: &'a ContextRequirements) -> Self {
        Self { requirements }
    }

    pub fn select<I: InstanceApi>(
        &self,
        api: &I,
        surface: vk::SurfaceKHR,
    ) -> ContextResult<SelectedAdapter> {
        let adapters = api
            .enumerate_adapters()
            .map_err(ContextError::query("physical devices"))?;

        if adapters.is_empty() {
            return Err(ContextError::NoAdaptersFound);
        }

        log::debug!("Evaluating {} adapter(s)", adapters.len());

        for (index, &handle) in adapters.iter().enumerate() {
            let name = api.adapter_name(handle);

            let verdict = match self.evaluate(api, handle, surface) {
                Ok(verdict) => verdict,
                Err(ContextError::Query { what, result }) => {
                    Err(Rejection::QueryFailed { what, result })
                }
                Err(e) => return Err(e),
            };

            match verdict {
                Ok(queue_families) => {
                    log::info!(
                        "Selected GPU {}: {} (graphics family {}, present family {})",
                        index,
                        name,
                        queue_families.graphics,
                        queue_families.present
                    );
                    return Ok(SelectedAdapter {
                        handle,
                        index,
                        name,
                        queue_families,
                    });
                }
                Err(rejection @ Rejection::QueryFailed { .. }) => {
                    log::warn!("Skipping GPU {} ({}): {}", index, name, rejection);
                }
                Err(rejection) => {
                    log::debug!("Skipping GPU {} ({}): {}", index, name, rejection);
                }
            }
        }

        Err(ContextError::NoSuitableAdapter)
    }

    /// Run the four suitability checks on one adapter
    ///
    /// The outer error is a failed platform query; the inner one is a verdict.
    /// `select` turns the former into a rejection and moves on.
    pub fn evaluate<I: InstanceApi>(
        &self,
        api: &I,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> ContextResult<Result<QueueFamilyLayout, Rejection>> {
        let indices = QueueFamilyIndices::resolve(api, adapter, surface)?;
        let Some(layout) = indices.layout() else {
            return Ok(Err(Rejection::IncompleteQueueFamilies(indices)));
        };

        let available = api
            .device_extensions(adapter)
            .map_err(ContextError::query("device extensions"))?;
        let missing = missing_extensions(&self.requirements.device_extensions, &available);
        if !missing.is_empty() {
            let names = missing
                .iter()
                .map(|name| name.to_string_lossy().into_owned())
                .collect();
            return Ok(Err(Rejection::MissingExtensions(names)));
        }

        // Only meaningful once swapchain support is known to exist
        if !SurfaceCapabilities::probe(api, adapter, surface)?.is_presentable() {
            return Ok(Err(Rejection::NotPresentable));
        }

        let missing = self.requirements.missing_features(&api.device_features(adapter));
        if !missing.is_empty() {
            return Ok(Err(Rejection::MissingFeatures(missing)));
        }

        Ok(Ok(layout))
    }
}
