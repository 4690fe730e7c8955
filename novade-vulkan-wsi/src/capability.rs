//! Driver capability gate.
//!
//! Checks the driver interface version requested by the framework and resolves
//! the two Vulkan entry points the bridge needs. The result is a plain value
//! that gets handed to whoever needs it; nothing is stored globally.

use std::ffi::CStr;
use std::fmt;
use std::ptr;

use ash::vk;
use tracing::{debug, error};

use crate::error::{Result, WsiError};
use crate::handle::{RawDisplay, RawSurface};
use crate::native::NativeWsi;

/// Driver interface version implemented by this crate.
pub const DRIVER_VERSION: u32 = 35;

const CREATE_WAYLAND_SURFACE: &CStr = c"vkCreateWaylandSurfaceKHR";
const WAYLAND_PRESENTATION_SUPPORT: &CStr = c"vkGetPhysicalDeviceWaylandPresentationSupportKHR";

/// Looks up Vulkan commands by name.
pub trait EntryPointResolver {
    fn resolve(&self, name: &CStr) -> vk::PFN_vkVoidFunction;
}

impl<F> EntryPointResolver for F
where
    F: Fn(&CStr) -> vk::PFN_vkVoidFunction,
{
    fn resolve(&self, name: &CStr) -> vk::PFN_vkVoidFunction {
        self(name)
    }
}

/// Resolves commands through `vkGetInstanceProcAddr` of a loaded entry.
pub struct InstanceProcResolver<'a> {
    entry: &'a ash::Entry,
    instance: vk::Instance,
}

impl<'a> InstanceProcResolver<'a> {
    pub fn new(entry: &'a ash::Entry, instance: vk::Instance) -> Self {
        Self { entry, instance }
    }
}

impl EntryPointResolver for InstanceProcResolver<'_> {
    fn resolve(&self, name: &CStr) -> vk::PFN_vkVoidFunction {
        unsafe { (self.entry.static_fn().get_instance_proc_addr)(self.instance, name.as_ptr()) }
    }
}

/// The resolved Wayland WSI commands.
#[derive(Clone, Copy)]
pub struct EntryPoints {
    create_wayland_surface: vk::PFN_vkCreateWaylandSurfaceKHR,
    wayland_presentation_support: vk::PFN_vkGetPhysicalDeviceWaylandPresentationSupportKHR,
}

impl fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoints")
            .field("create_wayland_surface", &(self.create_wayland_surface as *const ()))
            .field(
                "wayland_presentation_support",
                &(self.wayland_presentation_support as *const ()),
            )
            .finish()
    }
}

pub struct CapabilityGate;

impl CapabilityGate {
    /// Validates `requested_version` and resolves the WSI entry points.
    ///
    /// On a version mismatch the resolver is never consulted.
    pub fn initialize(
        requested_version: u32,
        resolver: &dyn EntryPointResolver,
    ) -> Result<EntryPoints> {
        if requested_version != DRIVER_VERSION {
            error!(
                target: "vulkan",
                "version mismatch, driver framework wants {} but driver has {}",
                requested_version, DRIVER_VERSION
            );
            return Err(WsiError::VersionMismatch {
                requested: requested_version,
                implemented: DRIVER_VERSION,
            });
        }

        let create = Self::load(resolver, CREATE_WAYLAND_SURFACE, "vkCreateWaylandSurfaceKHR")?;
        let support = Self::load(
            resolver,
            WAYLAND_PRESENTATION_SUPPORT,
            "vkGetPhysicalDeviceWaylandPresentationSupportKHR",
        )?;

        // SAFETY: the loader returns each command under its own name, so the
        // pointers have the signatures of the corresponding PFN types.
        let entry_points = unsafe {
            EntryPoints {
                create_wayland_surface: std::mem::transmute::<
                    unsafe extern "system" fn(),
                    vk::PFN_vkCreateWaylandSurfaceKHR,
                >(create),
                wayland_presentation_support: std::mem::transmute::<
                    unsafe extern "system" fn(),
                    vk::PFN_vkGetPhysicalDeviceWaylandPresentationSupportKHR,
                >(support),
            }
        };
        debug!(target: "vulkan", ?entry_points, "resolved Wayland WSI entry points");
        Ok(entry_points)
    }

    fn load(
        resolver: &dyn EntryPointResolver,
        name: &CStr,
        label: &'static str,
    ) -> Result<unsafe extern "system" fn()> {
        resolver.resolve(name).ok_or_else(|| {
            error!(target: "vulkan", "failed to resolve {}", label);
            WsiError::EntryPointNotFound(label)
        })
    }
}

impl NativeWsi for EntryPoints {
    fn create_surface(
        &self,
        instance: vk::Instance,
        display: RawDisplay,
        surface: RawSurface,
    ) -> std::result::Result<vk::SurfaceKHR, vk::Result> {
        let create_info = vk::WaylandSurfaceCreateInfoKHR::builder()
            .display(display.as_ptr())
            .surface(surface.as_ptr());
        let mut handle = vk::SurfaceKHR::null();
        let result = unsafe {
            (self.create_wayland_surface)(instance, &*create_info, ptr::null(), &mut handle)
        };
        result.result_with_success(handle)
    }

    fn presentation_support(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
        display: RawDisplay,
    ) -> bool {
        let supported = unsafe {
            (self.wayland_presentation_support)(physical_device, queue_family_index, display.as_ptr())
        };
        supported == vk::TRUE
    }
}
