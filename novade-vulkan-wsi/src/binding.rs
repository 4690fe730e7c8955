//! Vulkan surface bindings.
//!
//! [`SurfaceBindingManager`] turns a window into a `VkSurfaceKHR` backed by
//! the window's client surface, and tears that link down again. The record
//! lock is never held across the call into Vulkan, which may block or call
//! back into the window manager.

use std::sync::Arc;

use ash::vk;
use tracing::{error, trace};

use crate::client::ClientSurfaceRef;
use crate::compositor::Compositor;
use crate::directory::SurfaceDirectory;
use crate::error::{Result, WsiError};
use crate::handle::WindowHandle;
use crate::native::NativeWsi;

/// A Vulkan surface created for a window, together with the client surface
/// count it holds.
///
/// The `VkSurfaceKHR` itself is destroyed by its owner through
/// `vkDestroySurfaceKHR`; [`SurfaceBindingManager::destroy`] only drops the
/// compositor side.
#[derive(Debug)]
pub struct GpuSurfaceBinding {
    surface: vk::SurfaceKHR,
    client: ClientSurfaceRef,
}

impl GpuSurfaceBinding {
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub fn client(&self) -> &ClientSurfaceRef {
        &self.client
    }
}

pub struct SurfaceBindingManager {
    directory: Arc<SurfaceDirectory>,
    compositor: Arc<dyn Compositor>,
    native: Arc<dyn NativeWsi>,
}

impl SurfaceBindingManager {
    pub fn new(
        directory: Arc<SurfaceDirectory>,
        compositor: Arc<dyn Compositor>,
        native: Arc<dyn NativeWsi>,
    ) -> Self {
        Self {
            directory,
            compositor,
            native,
        }
    }

    /// Creates a Vulkan surface presenting into `window`'s client surface.
    pub fn create(&self, window: WindowHandle, instance: vk::Instance) -> Result<GpuSurfaceBinding> {
        trace!(target: "vulkan", %window, ?instance, "create surface");

        let client = self
            .directory
            .with_record(window, |record| record.get_or_create_client(&self.compositor))
            .ok_or_else(|| {
                error!(target: "vulkan", "Failed to find wayland surface for window={}", window);
                WsiError::NoSurfaceForWindow(window)
            })?
            .map_err(|err| {
                error!(target: "vulkan", "Failed to create client surface for window={}: {}", window, err);
                err
            })?;

        match self
            .native
            .create_surface(instance, self.compositor.display(), client.raw())
        {
            Ok(surface) => {
                trace!(target: "vulkan", ?surface, client = ?client.raw(), "created surface");
                Ok(GpuSurfaceBinding { surface, client })
            }
            Err(result) => {
                error!(target: "vulkan", "Failed to create vulkan wayland surface, res={:?}", result);
                self.release_client(&client);
                Err(WsiError::GpuApiSurfaceCreationFailed(result))
            }
        }
    }

    /// Releases the compositor side of `binding`.
    ///
    /// Works whether or not the window still exists.
    pub fn destroy(&self, binding: GpuSurfaceBinding) {
        trace!(target: "vulkan", window = %binding.client.window(), surface = ?binding.surface, "destroy surface");
        self.release_client(&binding.client);
    }

    /// The window whose client surface backs `binding`.
    pub fn window_for_binding(&self, binding: &GpuSurfaceBinding) -> WindowHandle {
        binding.client.window()
    }

    fn release_client(&self, client: &ClientSurfaceRef) {
        let released_under_lock = self.directory.with_record(client.window(), |record| {
            if client.release() && record.clear_client_if(client) {
                trace!(target: "vulkan", window = %record.window(), "unlinked destroyed client surface");
            }
        });

        if released_under_lock.is_none() {
            client.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::RawSurface;
    use crate::native::MockNativeWsi;
    use crate::testing::{FakeCompositor, DISPLAY_ADDR};
    use ash::vk::Handle;
    use mockall::predicate::always;

    struct Fixture {
        directory: Arc<SurfaceDirectory>,
        compositor: Arc<FakeCompositor>,
        window: WindowHandle,
    }

    impl Fixture {
        fn new() -> Self {
            let directory = Arc::new(SurfaceDirectory::new());
            let compositor = Arc::new(FakeCompositor::default());
            let window = WindowHandle::new(0x10);
            directory.insert(window, compositor.allocate_surface(), &*compositor);
            Self {
                directory,
                compositor,
                window,
            }
        }

        fn manager(&self, native: MockNativeWsi) -> SurfaceBindingManager {
            SurfaceBindingManager::new(self.directory.clone(), self.compositor.clone(), Arc::new(native))
        }

        fn record_client(&self) -> Option<ClientSurfaceRef> {
            self.directory
                .with_record(self.window, |record| record.client().cloned())
                .flatten()
        }
    }

    fn succeeding_native() -> MockNativeWsi {
        let mut native = MockNativeWsi::new();
        native
            .expect_create_surface()
            .returning(|_, _, surface: RawSurface| Ok(vk::SurfaceKHR::from_raw(surface.as_ptr() as u64)));
        native
    }

    #[test]
    fn create_without_record_never_calls_vulkan() {
        let fixture = Fixture::new();
        let mut native = MockNativeWsi::new();
        native.expect_create_surface().never();
        let manager = fixture.manager(native);

        let result = manager.create(WindowHandle::new(0x99), vk::Instance::null());
        assert!(matches!(result, Err(WsiError::NoSurfaceForWindow(w)) if w == WindowHandle::new(0x99)));
        assert!(fixture.compositor.created().is_empty());
    }

    #[test]
    fn create_passes_display_and_client_surface() {
        let fixture = Fixture::new();
        let mut native = MockNativeWsi::new();
        native
            .expect_create_surface()
            .withf(|instance, display, _surface| {
                *instance == vk::Instance::from_raw(7) && display.as_ptr() as usize == DISPLAY_ADDR
            })
            .times(1)
            .returning(|_, _, _| Ok(vk::SurfaceKHR::from_raw(0xabc)));
        let manager = fixture.manager(native);

        let binding = manager.create(fixture.window, vk::Instance::from_raw(7)).unwrap();
        assert_eq!(binding.surface().as_raw(), 0xabc);
        assert_eq!(manager.window_for_binding(&binding), fixture.window);
        assert_eq!(fixture.compositor.created(), vec![(fixture.window, binding.client().raw())]);
    }

    #[test]
    fn failed_vulkan_call_releases_client_surface() {
        let fixture = Fixture::new();
        let mut native = MockNativeWsi::new();
        native
            .expect_create_surface()
            .with(always(), always(), always())
            .times(1)
            .returning(|_, _, _| Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY));
        let manager = fixture.manager(native);

        let result = manager.create(fixture.window, vk::Instance::null());
        assert!(matches!(
            result,
            Err(WsiError::GpuApiSurfaceCreationFailed(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY))
        ));

        let (_, raw) = fixture.compositor.created()[0];
        assert_eq!(fixture.compositor.destroy_count(raw), 1);
        assert!(fixture.record_client().is_none());
    }

    #[test]
    fn failed_vulkan_call_keeps_shared_client_alive() {
        let fixture = Fixture::new();
        let manager = fixture.manager(succeeding_native());
        let first = manager.create(fixture.window, vk::Instance::null()).unwrap();

        let mut failing = MockNativeWsi::new();
        failing
            .expect_create_surface()
            .returning(|_, _, _| Err(vk::Result::ERROR_NATIVE_WINDOW_IN_USE_KHR));
        let failing_manager = fixture.manager(failing);
        assert!(failing_manager.create(fixture.window, vk::Instance::null()).is_err());

        assert_eq!(first.client().ref_count(), 1);
        assert_eq!(fixture.compositor.destroy_count(first.client().raw()), 0);
        assert!(fixture.record_client().is_some());
    }

    #[test]
    fn counts_follow_creates_and_destroys() {
        let fixture = Fixture::new();
        let manager = fixture.manager(succeeding_native());

        let mut bindings: Vec<_> = (0..4)
            .map(|_| manager.create(fixture.window, vk::Instance::null()).unwrap())
            .collect();
        let client = bindings[0].client().clone();
        assert_eq!(client.ref_count(), 4);
        assert_eq!(fixture.compositor.created().len(), 1);

        manager.destroy(bindings.pop().unwrap());
        manager.destroy(bindings.pop().unwrap());
        assert_eq!(client.ref_count(), 2);
        assert_eq!(fixture.compositor.destroy_count(client.raw()), 0);

        for binding in bindings.drain(..) {
            manager.destroy(binding);
        }
        assert_eq!(client.ref_count(), 0);
        assert_eq!(fixture.compositor.destroy_count(client.raw()), 1);
        assert!(fixture.record_client().is_none());
    }

    #[test]
    fn destroy_after_window_removal_is_safe() {
        let fixture = Fixture::new();
        let manager = fixture.manager(succeeding_native());
        let binding = manager.create(fixture.window, vk::Instance::null()).unwrap();
        let client = binding.client().clone();

        fixture.directory.remove(fixture.window, &*fixture.compositor);
        manager.destroy(binding);

        assert_eq!(client.ref_count(), 0);
        assert_eq!(fixture.compositor.destroy_count(client.raw()), 1);
        assert_eq!(fixture.compositor.detached(), vec![client.raw()]);
    }

    #[test]
    fn destroy_does_not_unlink_a_newer_client() {
        let fixture = Fixture::new();
        let manager = fixture.manager(succeeding_native());
        let old = manager.create(fixture.window, vk::Instance::null()).unwrap();

        // The window is re-created under the same handle and gets a new client.
        fixture.directory.remove(fixture.window, &*fixture.compositor);
        fixture
            .directory
            .insert(fixture.window, fixture.compositor.allocate_surface(), &*fixture.compositor);
        let new = manager.create(fixture.window, vk::Instance::null()).unwrap();
        assert!(!Arc::ptr_eq(old.client(), new.client()));

        manager.destroy(old);
        let linked = fixture.record_client().unwrap();
        assert!(Arc::ptr_eq(&linked, new.client()));
        assert_eq!(new.client().ref_count(), 1);
    }
}
