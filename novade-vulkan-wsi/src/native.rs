//! The slice of the Vulkan WSI API this crate calls into.
//!
//! Production code goes through [`crate::capability::EntryPoints`]; tests plug
//! in mocks so no Vulkan library has to be loaded.

use ash::vk;

use crate::handle::{RawDisplay, RawSurface};

#[cfg_attr(test, mockall::automock)]
pub trait NativeWsi: Send + Sync {
    /// `vkCreateWaylandSurfaceKHR` without an allocator.
    fn create_surface(
        &self,
        instance: vk::Instance,
        display: RawDisplay,
        surface: RawSurface,
    ) -> Result<vk::SurfaceKHR, vk::Result>;

    /// `vkGetPhysicalDeviceWaylandPresentationSupportKHR`.
    fn presentation_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        display: RawDisplay,
    ) -> bool;
}
