//! Boundaries towards the compositor transport and the window manager.
//!
//! [`Compositor`] is the thin protocol-facing side: it hands out the process
//! display pointer, creates and destroys client surfaces, and commits.
//! [`SurfaceReconciler`] is the window manager's configure logic, invoked with
//! the record lock held.

use thiserror::Error;

use crate::directory::CompositorSurfaceRecord;
use crate::handle::{RawDisplay, RawSurface, WindowHandle};

#[derive(Debug, Error)]
pub enum CompositorError {
    #[error("failed to create compositor surface: {0}")]
    SurfaceCreation(String),

    #[error("compositor transport error: {0}")]
    Transport(String),

    #[cfg(feature = "wayland")]
    #[error("failed to connect to the Wayland display: {0}")]
    Connect(#[from] wayland_client::ConnectError),

    #[cfg(feature = "wayland")]
    #[error("failed to enumerate Wayland globals: {0}")]
    Globals(#[from] wayland_client::globals::GlobalError),

    #[cfg(feature = "wayland")]
    #[error("required Wayland global is missing: {0}")]
    Bind(#[from] wayland_client::globals::BindError),
}

/// Compositor transport used by the surface bridge.
///
/// Implementations must be callable from any thread. Calls may happen while a
/// [`CompositorSurfaceRecord`] lock is held, so they must not call back into
/// the record directory.
pub trait Compositor: Send + Sync {
    /// The process-wide display all surfaces belong to.
    fn display(&self) -> RawDisplay;

    /// Creates the surface Vulkan will present into for `window`.
    ///
    /// `parent` is the window's own toplevel surface. The created surface must
    /// carry `window` as its user data. `parent` must not be committed here;
    /// its commits belong to presented frames.
    fn create_client_surface(
        &self,
        window: WindowHandle,
        parent: RawSurface,
    ) -> Result<RawSurface, CompositorError>;

    /// Unlinks a still-alive client surface from its parent after the parent
    /// window went away. The surface itself stays valid until
    /// [`Compositor::destroy_client_surface`].
    fn detach_client_surface(&self, _surface: RawSurface) {}

    /// Destroys a client surface. Called exactly once per created surface.
    fn destroy_client_surface(&self, surface: RawSurface);

    /// Issues `wl_surface.commit` on `surface`.
    fn commit(&self, surface: RawSurface);
}

/// Configure handling owned by the window manager.
///
/// Both methods run with the record's lock held.
pub trait SurfaceReconciler: Send + Sync {
    /// Makes sure the compositor never treats the toplevel as contentless once
    /// a frame has been presented into its client surface.
    fn ensure_contents(&self, record: &mut CompositorSurfaceRecord);

    /// Acknowledges `record.processing` against the current window state.
    ///
    /// Returns `true` when the configure was acknowledged and a commit should
    /// follow. Returning `false` leaves the request for the next present.
    fn reconfigure(&self, record: &mut CompositorSurfaceRecord) -> bool;
}
