//! Reference-counted client surfaces.
//!
//! A [`ClientSurface`] is the compositor surface Vulkan presents into. It is
//! shared between the window's [`CompositorSurfaceRecord`] (which only points
//! at it) and every [`crate::binding::GpuSurfaceBinding`] created for it (each
//! owning one count). The compositor object is destroyed when the count drops
//! to zero, and a destroyed client can never be acquired again.
//!
//! [`CompositorSurfaceRecord`]: crate::directory::CompositorSurfaceRecord

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::compositor::Compositor;
use crate::handle::{RawSurface, WindowHandle};

/// Shared handle to a [`ClientSurface`].
pub type ClientSurfaceRef = Arc<ClientSurface>;

pub struct ClientSurface {
    window: WindowHandle,
    raw: RawSurface,
    ref_count: AtomicUsize,
    compositor: Arc<dyn Compositor>,
}

impl ClientSurface {
    /// Wraps a freshly created compositor surface. The caller owns the first
    /// count.
    pub(crate) fn new(
        window: WindowHandle,
        raw: RawSurface,
        compositor: Arc<dyn Compositor>,
    ) -> ClientSurfaceRef {
        Arc::new(Self {
            window,
            raw,
            ref_count: AtomicUsize::new(1),
            compositor,
        })
    }

    /// Takes one more count, unless the surface has already been destroyed.
    pub fn try_acquire(&self) -> bool {
        self.ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count > 0).then(|| count + 1)
            })
            .is_ok()
    }

    /// Drops one count.
    ///
    /// Returns `true` if this call released the last count and destroyed the
    /// compositor surface. Releasing an already destroyed surface is a no-op.
    pub fn release(&self) -> bool {
        let previous = self
            .ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            });

        match previous {
            Ok(1) => {
                trace!(target: "vulkan", window = %self.window, surface = ?self.raw, "destroying client surface");
                self.compositor.destroy_client_surface(self.raw);
                true
            }
            _ => false,
        }
    }

    /// Window this surface was created for.
    ///
    /// This is a plain value, not a reference into the window manager; the
    /// window may already be gone.
    pub fn window(&self) -> WindowHandle {
        self.window
    }

    pub fn raw(&self) -> RawSurface {
        self.raw
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::Acquire)
    }

    pub fn is_destroyed(&self) -> bool {
        self.ref_count() == 0
    }
}

impl fmt::Debug for ClientSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSurface")
            .field("window", &self.window)
            .field("raw", &self.raw)
            .field("ref_count", &self.ref_count())
            .finish_non_exhaustive()
    }
}
