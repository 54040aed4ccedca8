// Queue family resolution
//
// Finds the first family able to draw and the first able to present to a
// surface. A single family may do both.

use super::error::{ContextError, ContextResult};
use super::platform::{ImageSharing, InstanceApi};
use ash::vk;

/// Graphics/presentation family indices for one adapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Scan the adapter's families in index order, stopping once both roles
    /// are filled. An unresolved role is not an error here.
    pub fn resolve<I: InstanceApi>(
        api: &I,
        adapter: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> ContextResult<Self> {
        let mut indices = Self::default();

        for (index, family) in api.queue_families(adapter).iter().enumerate() {
            let index = index as u32;

            if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics = Some(index);
            }

            if indices.present.is_none()
                && api
                    .surface_support(adapter, index, surface)
                    .map_err(ContextError::query("surface support"))?
            {
                indices.present = Some(index);
            }

            if indices.is_complete() {
                break;
            }
        }

        Ok(indices)
    }

    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Both roles, if resolved
    pub fn layout(&self) -> Option<QueueFamilyLayout> {
        Some(QueueFamilyLayout {
            graphics: self.graphics?,
            present: self.present?,
        })
    }
}

/// A complete set of family indices, fixed for the life of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyLayout {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyLayout {
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct family indices, ascending; one queue is requested per entry
    pub fn unique(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            let mut families = vec![self.graphics, self.present];
            families.sort_unstable();
            families
        }
    }

    /// Swapchain images only need concurrent sharing across distinct families
    pub fn image_sharing(&self) -> ImageSharing {
        if self.is_shared() {
            ImageSharing::Exclusive
        } else {
            ImageSharing::Concurrent([self.graphics, self.present])
        }
    }
}
