//! Per-window compositor surface records.
//!
//! The window manager inserts a [`CompositorSurfaceRecord`] when a window gets
//! a Wayland surface and removes it when the window goes away. Everything else
//! reaches a record through [`SurfaceDirectory::with_record`], which holds the
//! record's mutex for the duration of a closure and nothing longer. No Vulkan
//! call may be made from inside that closure.
//!
//! Lock order is directory map, then record. The map lock is released before
//! the record lock is taken; a record removed in between is marked destroyed
//! and treated as missing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, trace, warn};

use crate::client::{ClientSurface, ClientSurfaceRef};
use crate::compositor::Compositor;
use crate::error::{Result, WsiError};
use crate::handle::{RawSurface, WindowHandle};

/// A configure event as tracked by the window manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigureRequest {
    /// Compositor serial; zero means no request.
    pub serial: u32,
    /// Whether the window manager has applied this request to the window.
    pub processed: bool,
}

/// Derived state of a [`ConfigureRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureState {
    Idle,
    Pending(u32),
    Processed(u32),
}

impl ConfigureRequest {
    pub fn state(&self) -> ConfigureState {
        match (self.serial, self.processed) {
            (0, _) => ConfigureState::Idle,
            (serial, false) => ConfigureState::Pending(serial),
            (serial, true) => ConfigureState::Processed(serial),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Compositor-side state of one window.
#[derive(Debug)]
pub struct CompositorSurfaceRecord {
    window: WindowHandle,
    surface: RawSurface,
    client: Option<ClientSurfaceRef>,
    /// Latest configure received from the compositor.
    pub pending: ConfigureRequest,
    /// Configure the window manager is acting upon.
    pub processing: ConfigureRequest,
    has_contents: bool,
    destroyed: bool,
}

impl CompositorSurfaceRecord {
    fn new(window: WindowHandle, surface: RawSurface) -> Self {
        Self {
            window,
            surface,
            client: None,
            pending: ConfigureRequest::default(),
            processing: ConfigureRequest::default(),
            has_contents: false,
            destroyed: false,
        }
    }

    pub fn window(&self) -> WindowHandle {
        self.window
    }

    /// The window's toplevel surface.
    pub fn surface(&self) -> RawSurface {
        self.surface
    }

    /// The client surface currently linked to this window, if any.
    pub fn client(&self) -> Option<&ClientSurfaceRef> {
        self.client.as_ref()
    }

    /// Returns the window's client surface with one extra count taken,
    /// creating it through `compositor` if there is none yet.
    pub fn get_or_create_client(
        &mut self,
        compositor: &Arc<dyn Compositor>,
    ) -> Result<ClientSurfaceRef> {
        if let Some(client) = &self.client {
            if client.try_acquire() {
                return Ok(client.clone());
            }
            // Lost the count to a concurrent release; the surface is gone.
            self.client = None;
        }

        let raw = compositor
            .create_client_surface(self.window, self.surface)
            .map_err(|source| WsiError::ClientSurfaceUnavailable {
                window: self.window,
                source,
            })?;
        let client = ClientSurface::new(self.window, raw, compositor.clone());
        debug!(target: "vulkan", window = %self.window, surface = ?raw, "created client surface");
        self.client = Some(client.clone());
        Ok(client)
    }

    /// Forgets the client pointer if it still refers to `client`.
    pub fn clear_client_if(&mut self, client: &ClientSurfaceRef) -> bool {
        match &self.client {
            Some(current) if Arc::ptr_eq(current, client) => {
                self.client = None;
                true
            }
            _ => false,
        }
    }

    /// Stores a configure event received from the compositor.
    pub fn receive_configure(&mut self, serial: u32) {
        self.pending = ConfigureRequest {
            serial,
            processed: false,
        };
    }

    /// Moves the pending configure into processing and marks it processed.
    ///
    /// Returns the serial, or `None` when nothing was pending.
    pub fn begin_processing(&mut self) -> Option<u32> {
        match self.pending.state() {
            ConfigureState::Pending(serial) | ConfigureState::Processed(serial) => {
                self.processing = ConfigureRequest {
                    serial,
                    processed: true,
                };
                self.pending.clear();
                Some(serial)
            }
            ConfigureState::Idle => None,
        }
    }

    /// Marks the processing configure as applied.
    pub fn finish_configure(&mut self) {
        self.processing.clear();
    }

    pub fn has_contents(&self) -> bool {
        self.has_contents
    }

    pub fn set_has_contents(&mut self, has_contents: bool) {
        self.has_contents = has_contents;
    }
}

/// Window to compositor surface record map.
#[derive(Debug, Default)]
pub struct SurfaceDirectory {
    records: RwLock<HashMap<WindowHandle, Arc<Mutex<CompositorSurfaceRecord>>>>,
}

fn lock_record(record: &Mutex<CompositorSurfaceRecord>) -> MutexGuard<'_, CompositorSurfaceRecord> {
    record.lock().unwrap_or_else(|poisoned| {
        warn!(target: "vulkan", "recovering poisoned surface record lock");
        poisoned.into_inner()
    })
}

impl SurfaceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `surface` as the toplevel surface of `window`.
    ///
    /// An existing record for the same window is replaced as if it had been
    /// removed first, and `false` is returned.
    pub fn insert(&self, window: WindowHandle, surface: RawSurface, compositor: &dyn Compositor) -> bool {
        let previous = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(window, Arc::new(Mutex::new(CompositorSurfaceRecord::new(window, surface))));

        match previous {
            Some(previous) => {
                warn!(target: "vulkan", %window, "replacing existing surface record");
                Self::retire(&previous, compositor);
                false
            }
            None => {
                trace!(target: "vulkan", %window, surface = ?surface, "registered surface record");
                true
            }
        }
    }

    /// Removes the record of `window`.
    ///
    /// A client surface still in use by Vulkan is detached from the window but
    /// stays alive until its last binding is destroyed.
    pub fn remove(&self, window: WindowHandle, compositor: &dyn Compositor) -> bool {
        let removed = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&window);

        match removed {
            Some(record) => {
                Self::retire(&record, compositor);
                trace!(target: "vulkan", %window, "removed surface record");
                true
            }
            None => false,
        }
    }

    fn retire(record: &Mutex<CompositorSurfaceRecord>, compositor: &dyn Compositor) {
        let mut record = lock_record(record);
        record.destroyed = true;
        if let Some(client) = record.client.take() {
            if !client.is_destroyed() {
                compositor.detach_client_surface(client.raw());
            }
        }
    }

    pub fn contains(&self, window: WindowHandle) -> bool {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&window)
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` with the record of `window` locked.
    ///
    /// Returns `None` without calling `f` if the window has no record. The
    /// lock is released when `f` returns, on every path.
    pub fn with_record<R>(
        &self,
        window: WindowHandle,
        f: impl FnOnce(&mut CompositorSurfaceRecord) -> R,
    ) -> Option<R> {
        let record = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&window)
            .cloned()?;

        let mut guard = lock_record(&record);
        if guard.destroyed {
            return None;
        }
        Some(f(&mut *guard))
    }
}
