//! Wayland surface glue for a Vulkan driver.
//!
//! Maps NovaDE window handles to `VkSurfaceKHR` objects created through
//! `VK_KHR_wayland_surface`, keeps the compositor-side client surface alive
//! for as long as any Vulkan surface uses it, and commits configure changes
//! together with the frame presented for them.
//!
//! The usual wiring:
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use novade_vulkan_wsi::{
//!     driver, CompositorSurfaceRecord, DriverBackend, InstanceProcResolver, SurfaceDirectory,
//!     SurfaceReconciler, WaylandCompositor, WindowHandle, DRIVER_VERSION,
//! };
//!
//! struct AckEverything;
//! impl SurfaceReconciler for AckEverything {
//!     fn ensure_contents(&self, record: &mut CompositorSurfaceRecord) {
//!         record.set_has_contents(true);
//!     }
//!     fn reconfigure(&self, _record: &mut CompositorSurfaceRecord) -> bool {
//!         true
//!     }
//! }
//!
//! # fn run(entry: &ash::Entry, instance: vk::Instance) -> Result<(), Box<dyn std::error::Error>> {
//! let (compositor, _queue) = WaylandCompositor::connect_to_env()?;
//! let directory = Arc::new(SurfaceDirectory::new());
//! let backend = DriverBackend::new(directory, Arc::new(compositor), Arc::new(AckEverything));
//! let table = driver::init(DRIVER_VERSION, &InstanceProcResolver::new(entry, instance), backend)?;
//!
//! let binding = table.create(WindowHandle::new(0x2a), instance)?;
//! table.destroy(binding);
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod capability;
pub mod client;
pub mod compositor;
pub mod config;
pub mod directory;
pub mod driver;
pub mod error;
pub mod handle;
pub mod logging;
pub mod native;
pub mod presentation;
#[cfg(feature = "wayland")]
pub mod wayland;

#[cfg(test)]
mod testing;

pub use binding::{GpuSurfaceBinding, SurfaceBindingManager};
pub use capability::{CapabilityGate, EntryPointResolver, EntryPoints, InstanceProcResolver, DRIVER_VERSION};
pub use client::{ClientSurface, ClientSurfaceRef};
pub use compositor::{Compositor, CompositorError, SurfaceReconciler};
pub use config::{LoggingConfig, MissingSurfaceError, SurfaceConfig, WsiConfig};
pub use directory::{CompositorSurfaceRecord, ConfigureRequest, ConfigureState, SurfaceDirectory};
pub use driver::{DriverBackend, DriverFunctionTable, HOST_SURFACE_EXTENSION};
pub use error::{ConfigError, Result, WsiError};
pub use handle::{RawDisplay, RawSurface, WindowHandle};
pub use native::NativeWsi;
pub use presentation::{PresentOutcome, PresentationCoordinator};
#[cfg(feature = "wayland")]
pub use wayland::{WaylandClientState, WaylandCompositor};
