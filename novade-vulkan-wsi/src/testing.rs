//! In-crate fakes for the compositor and window manager boundaries.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::compositor::{Compositor, CompositorError, SurfaceReconciler};
use crate::directory::CompositorSurfaceRecord;
use crate::handle::{RawDisplay, RawSurface, WindowHandle};

pub(crate) const DISPLAY_ADDR: usize = 0xd15;

#[derive(Default)]
pub(crate) struct FakeCompositor {
    next_surface: AtomicUsize,
    fail_creation: AtomicBool,
    created: Mutex<Vec<(WindowHandle, RawSurface)>>,
    destroyed: Mutex<HashMap<RawSurface, usize>>,
    detached: Mutex<Vec<RawSurface>>,
    commits: Mutex<Vec<RawSurface>>,
}

impl FakeCompositor {
    pub(crate) fn allocate_surface(&self) -> RawSurface {
        let index = self.next_surface.fetch_add(1, Ordering::Relaxed);
        RawSurface::new((0x1000 + index * 0x10) as *mut c_void).unwrap()
    }

    pub(crate) fn set_fail_creation(&self, fail: bool) {
        self.fail_creation.store(fail, Ordering::Relaxed);
    }

    pub(crate) fn created(&self) -> Vec<(WindowHandle, RawSurface)> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn destroy_count(&self, surface: RawSurface) -> usize {
        self.destroyed.lock().unwrap().get(&surface).copied().unwrap_or(0)
    }

    pub(crate) fn detached(&self) -> Vec<RawSurface> {
        self.detached.lock().unwrap().clone()
    }

    pub(crate) fn commits(&self) -> Vec<RawSurface> {
        self.commits.lock().unwrap().clone()
    }
}

impl Compositor for FakeCompositor {
    fn display(&self) -> RawDisplay {
        RawDisplay::new(DISPLAY_ADDR as *mut c_void).unwrap()
    }

    fn create_client_surface(
        &self,
        window: WindowHandle,
        _parent: RawSurface,
    ) -> Result<RawSurface, CompositorError> {
        if self.fail_creation.load(Ordering::Relaxed) {
            return Err(CompositorError::SurfaceCreation("out of ids".to_string()));
        }
        let surface = self.allocate_surface();
        self.created.lock().unwrap().push((window, surface));
        Ok(surface)
    }

    fn detach_client_surface(&self, surface: RawSurface) {
        self.detached.lock().unwrap().push(surface);
    }

    fn destroy_client_surface(&self, surface: RawSurface) {
        *self.destroyed.lock().unwrap().entry(surface).or_default() += 1;
    }

    fn commit(&self, surface: RawSurface) {
        self.commits.lock().unwrap().push(surface);
    }
}

/// Reconciler whose `reconfigure` answer can be flipped by the test.
#[derive(Default)]
pub(crate) struct FakeReconciler {
    pub(crate) accept: AtomicBool,
    pub(crate) ensure_calls: AtomicUsize,
    pub(crate) reconfigure_calls: AtomicUsize,
}

impl SurfaceReconciler for FakeReconciler {
    fn ensure_contents(&self, record: &mut CompositorSurfaceRecord) {
        self.ensure_calls.fetch_add(1, Ordering::Relaxed);
        record.set_has_contents(true);
    }

    fn reconfigure(&self, _record: &mut CompositorSurfaceRecord) -> bool {
        self.reconfigure_calls.fetch_add(1, Ordering::Relaxed);
        self.accept.load(Ordering::Relaxed)
    }
}
