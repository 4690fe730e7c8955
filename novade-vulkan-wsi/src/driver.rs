//! The function table handed to the driver framework.

use std::sync::Arc;

use ash::vk;
use tracing::{info, warn};

use crate::binding::{GpuSurfaceBinding, SurfaceBindingManager};
use crate::capability::{CapabilityGate, EntryPointResolver};
use crate::compositor::{Compositor, SurfaceReconciler};
use crate::config::{SurfaceConfig, WsiConfig};
use crate::directory::SurfaceDirectory;
use crate::error::{Result, WsiError};
use crate::handle::WindowHandle;
use crate::native::NativeWsi;
use crate::presentation::{PresentOutcome, PresentationCoordinator};

/// Instance extension the host Vulkan driver has to expose.
pub const HOST_SURFACE_EXTENSION: &str = "VK_KHR_wayland_surface";

/// The window manager side the driver is wired to.
#[derive(Clone)]
pub struct DriverBackend {
    pub directory: Arc<SurfaceDirectory>,
    pub compositor: Arc<dyn Compositor>,
    pub reconciler: Arc<dyn SurfaceReconciler>,
}

impl DriverBackend {
    pub fn new(
        directory: Arc<SurfaceDirectory>,
        compositor: Arc<dyn Compositor>,
        reconciler: Arc<dyn SurfaceReconciler>,
    ) -> Self {
        Self {
            directory,
            compositor,
            reconciler,
        }
    }
}

/// Runs the capability gate and builds the function table with default
/// settings.
pub fn init(
    version: u32,
    resolver: &dyn EntryPointResolver,
    backend: DriverBackend,
) -> Result<DriverFunctionTable> {
    init_with_config(version, resolver, backend, &WsiConfig::default())
}

pub fn init_with_config(
    version: u32,
    resolver: &dyn EntryPointResolver,
    backend: DriverBackend,
    config: &WsiConfig,
) -> Result<DriverFunctionTable> {
    let entry_points = CapabilityGate::initialize(version, resolver)?;
    info!(target: "vulkan", version, "Wayland Vulkan surface driver initialized");
    Ok(DriverFunctionTable::with_native(
        Arc::new(entry_points),
        backend,
        config.surface.clone(),
    ))
}

pub struct DriverFunctionTable {
    bindings: SurfaceBindingManager,
    presentation: PresentationCoordinator,
    native: Arc<dyn NativeWsi>,
    compositor: Arc<dyn Compositor>,
    surface_config: SurfaceConfig,
}

impl DriverFunctionTable {
    /// Builds the table around an already resolved native API.
    pub fn with_native(native: Arc<dyn NativeWsi>, backend: DriverBackend, surface_config: SurfaceConfig) -> Self {
        let DriverBackend {
            directory,
            compositor,
            reconciler,
        } = backend;

        Self {
            bindings: SurfaceBindingManager::new(directory.clone(), compositor.clone(), native.clone()),
            presentation: PresentationCoordinator::new(directory, compositor.clone(), reconciler),
            native,
            compositor,
            surface_config,
        }
    }

    pub fn create(&self, window: WindowHandle, instance: vk::Instance) -> Result<GpuSurfaceBinding> {
        self.bindings.create(window, instance)
    }

    /// [`Self::create`] with the error reduced to the `VkResult` the Vulkan
    /// caller sees.
    pub fn create_surface_khr(
        &self,
        window: WindowHandle,
        instance: vk::Instance,
    ) -> std::result::Result<GpuSurfaceBinding, vk::Result> {
        self.create(window, instance).map_err(|err| self.vk_result(&err))
    }

    pub fn destroy(&self, binding: GpuSurfaceBinding) {
        self.bindings.destroy(binding);
    }

    pub fn window_for_binding(&self, binding: &GpuSurfaceBinding) -> WindowHandle {
        self.bindings.window_for_binding(binding)
    }

    pub fn on_presented(&self, window: WindowHandle, result: vk::Result) -> PresentOutcome {
        self.presentation.on_presented(window, result)
    }

    pub fn flush_configure(&self, window: WindowHandle) -> PresentOutcome {
        self.presentation.flush_configure(window)
    }

    pub fn presentation_support(&self, physical_device: vk::PhysicalDevice, queue_family_index: u32) -> bool {
        self.native
            .presentation_support(physical_device, queue_family_index, self.compositor.display())
    }

    pub fn host_extension_name(&self) -> &'static str {
        HOST_SURFACE_EXTENSION
    }

    fn vk_result(&self, err: &WsiError) -> vk::Result {
        match err {
            WsiError::NoSurfaceForWindow(_) | WsiError::ClientSurfaceUnavailable { .. } => {
                let result = self.surface_config.missing_surface_error.vk_result();
                warn!(target: "vulkan", "{}, reporting {:?}", err, result);
                result
            }
            other => other.vk_result(),
        }
    }
}
