#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use ash::vk;
use ash::vk::Handle;
use mockall::mock;
use novade_vulkan_wsi::{
    Compositor, CompositorError, CompositorSurfaceRecord, NativeWsi, RawDisplay, RawSurface,
    SurfaceReconciler, WindowHandle,
};

pub const DISPLAY_ADDR: usize = 0xd15;

mock! {
    pub Native {}
    impl NativeWsi for Native {
        fn create_surface(
            &self,
            instance: vk::Instance,
            display: RawDisplay,
            surface: RawSurface,
        ) -> Result<vk::SurfaceKHR, vk::Result>;
        fn presentation_support(
            &self,
            physical_device: vk::PhysicalDevice,
            queue_family_index: u32,
            display: RawDisplay,
        ) -> bool;
    }
}

/// A native API whose surfaces mirror the client surface address.
pub fn mirroring_native() -> MockNative {
    let mut native = MockNative::new();
    native
        .expect_create_surface()
        .returning(|_, _, surface| Ok(vk::SurfaceKHR::from_raw(surface.as_ptr() as u64)));
    native
}

/// Compositor that hands out fake surface addresses and records every call.
#[derive(Default)]
pub struct RecordingCompositor {
    next_surface: AtomicUsize,
    created: Mutex<Vec<(WindowHandle, RawSurface)>>,
    destroyed: Mutex<HashMap<RawSurface, usize>>,
    commits: Mutex<Vec<RawSurface>>,
}

impl RecordingCompositor {
    pub fn allocate_surface(&self) -> RawSurface {
        let index = self.next_surface.fetch_add(1, Ordering::Relaxed);
        RawSurface::new((0x10_000 + index * 0x10) as *mut c_void).unwrap()
    }

    pub fn created(&self) -> Vec<(WindowHandle, RawSurface)> {
        self.created.lock().unwrap().clone()
    }

    pub fn destroy_count(&self, surface: RawSurface) -> usize {
        self.destroyed.lock().unwrap().get(&surface).copied().unwrap_or(0)
    }

    pub fn destroyed_total(&self) -> usize {
        self.destroyed.lock().unwrap().values().sum()
    }

    pub fn max_destroy_count(&self) -> usize {
        self.destroyed.lock().unwrap().values().copied().max().unwrap_or(0)
    }

    pub fn commits(&self) -> Vec<RawSurface> {
        self.commits.lock().unwrap().clone()
    }
}

impl Compositor for RecordingCompositor {
    fn display(&self) -> RawDisplay {
        RawDisplay::new(DISPLAY_ADDR as *mut c_void).unwrap()
    }

    fn create_client_surface(
        &self,
        window: WindowHandle,
        _parent: RawSurface,
    ) -> Result<RawSurface, CompositorError> {
        let surface = self.allocate_surface();
        self.created.lock().unwrap().push((window, surface));
        Ok(surface)
    }

    fn destroy_client_surface(&self, surface: RawSurface) {
        *self.destroyed.lock().unwrap().entry(surface).or_default() += 1;
    }

    fn commit(&self, surface: RawSurface) {
        self.commits.lock().unwrap().push(surface);
    }
}

/// Reconciler that acknowledges configures once `ready` is set.
#[derive(Default)]
pub struct ToggleReconciler {
    pub ready: AtomicBool,
}

impl SurfaceReconciler for ToggleReconciler {
    fn ensure_contents(&self, record: &mut CompositorSurfaceRecord) {
        record.set_has_contents(true);
    }

    fn reconfigure(&self, _record: &mut CompositorSurfaceRecord) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}
