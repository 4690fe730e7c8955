//! [`Compositor`] implementation on top of `wayland-client`.
//!
//! Uses the system libwayland backend so `wl_display*` and `wl_surface*`
//! pointers can be handed to the Vulkan driver. Client surfaces are created
//! on the connection's own queue; their events are of no interest, so the
//! queue returned by [`WaylandCompositor::connect_to_env`] only needs to be
//! dispatched to keep it drained.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};
use wayland_backend::client::ObjectId;
use wayland_client::globals::{registry_queue_init, GlobalListContents};
use wayland_client::protocol::{
    wl_compositor::WlCompositor, wl_region::WlRegion, wl_registry, wl_subcompositor::WlSubcompositor,
    wl_subsurface::WlSubsurface, wl_surface,
};
use wayland_client::{delegate_noop, Connection, Dispatch, EventQueue, Proxy, QueueHandle};

use crate::compositor::{Compositor, CompositorError};
use crate::handle::{RawDisplay, RawSurface, WindowHandle};

/// Dispatch state for the objects the bridge creates.
#[derive(Debug, Default)]
pub struct WaylandClientState;

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for WaylandClientState {
    fn event(
        _state: &mut Self,
        _registry: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_surface::WlSurface, WindowHandle> for WaylandClientState {
    fn event(
        _state: &mut Self,
        _surface: &wl_surface::WlSurface,
        event: wl_surface::Event,
        window: &WindowHandle,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        trace!(target: "vulkan", %window, ?event, "client surface event");
    }
}

delegate_noop!(WaylandClientState: WlCompositor);
delegate_noop!(WaylandClientState: WlSubcompositor);
delegate_noop!(WaylandClientState: WlSubsurface);
delegate_noop!(WaylandClientState: WlRegion);

struct ClientProxies {
    surface: wl_surface::WlSurface,
    subsurface: Option<WlSubsurface>,
}

pub struct WaylandCompositor {
    connection: Connection,
    display: RawDisplay,
    compositor: WlCompositor,
    subcompositor: Option<WlSubcompositor>,
    queue: QueueHandle<WaylandClientState>,
    surfaces: Mutex<HashMap<RawSurface, ClientProxies>>,
}

impl WaylandCompositor {
    /// Connects to `$WAYLAND_DISPLAY` and binds the globals the bridge needs.
    pub fn connect_to_env() -> Result<(Self, EventQueue<WaylandClientState>), CompositorError> {
        let connection = Connection::connect_to_env()?;
        Self::new(connection)
    }

    /// Binds the required globals on an existing connection.
    ///
    /// `wl_subcompositor` is optional; without it client surfaces are not
    /// attached to their window.
    pub fn new(connection: Connection) -> Result<(Self, EventQueue<WaylandClientState>), CompositorError> {
        let (globals, event_queue) = registry_queue_init::<WaylandClientState>(&connection)?;
        let queue = event_queue.handle();

        let compositor: WlCompositor = globals.bind(&queue, 1..=4, ())?;
        let subcompositor: Option<WlSubcompositor> = match globals.bind(&queue, 1..=1, ()) {
            Ok(subcompositor) => Some(subcompositor),
            Err(e) => {
                warn!(target: "vulkan", "wl_subcompositor unavailable: {}", e);
                None
            }
        };

        let raw_display = RawDisplay::new(connection.display().id().as_ptr() as *mut c_void)
            .ok_or_else(|| CompositorError::Transport("connection has no wl_display pointer".to_string()))?;

        debug!(target: "vulkan", display = ?raw_display, "bound Wayland globals");
        Ok((
            Self {
                connection,
                display: raw_display,
                compositor,
                subcompositor,
                queue,
                surfaces: Mutex::new(HashMap::new()),
            },
            event_queue,
        ))
    }

    fn lock_surfaces(&self) -> MutexGuard<'_, HashMap<RawSurface, ClientProxies>> {
        self.surfaces.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wraps a `wl_surface*` created elsewhere on this display.
    fn surface_from_raw(&self, raw: RawSurface) -> Result<wl_surface::WlSurface, CompositorError> {
        // SAFETY: `raw` is a live wl_surface proxy on this connection's display.
        let id = unsafe {
            ObjectId::from_ptr(
                wl_surface::WlSurface::interface(),
                raw.as_ptr() as *mut wayland_sys::client::wl_proxy,
            )
        }
        .map_err(|e| CompositorError::Transport(format!("invalid wl_surface {:?}: {}", raw, e)))?;

        wl_surface::WlSurface::from_id(&self.connection, id)
            .map_err(|e| CompositorError::Transport(format!("invalid wl_surface {:?}: {}", raw, e)))
    }

    fn flush(&self) {
        if let Err(e) = self.connection.flush() {
            warn!(target: "vulkan", "failed to flush Wayland connection: {}", e);
        }
    }
}

impl Compositor for WaylandCompositor {
    fn display(&self) -> RawDisplay {
        self.display
    }

    fn create_client_surface(&self, window: WindowHandle, parent: RawSurface) -> Result<RawSurface, CompositorError> {
        let surface = self.compositor.create_surface(&self.queue, window);
        let raw = RawSurface::new(surface.id().as_ptr() as *mut c_void)
            .ok_or_else(|| CompositorError::SurfaceCreation(format!("no wl_surface created for window {}", window)))?;

        // The window manager handles input on the toplevel surface.
        let empty_region = self.compositor.create_region(&self.queue, ());
        surface.set_input_region(Some(&empty_region));
        empty_region.destroy();

        let subsurface = match &self.subcompositor {
            Some(subcompositor) => {
                let parent = match self.surface_from_raw(parent) {
                    Ok(parent) => parent,
                    Err(e) => {
                        surface.destroy();
                        return Err(e);
                    }
                };
                // Linked and placed on the parent's next commit, which only
                // happens with a presented frame. Committing the parent here
                // would apply an acked configure with stale contents.
                let subsurface = subcompositor.get_subsurface(&surface, &parent, &self.queue, ());
                subsurface.set_desync();
                subsurface.set_position(0, 0);
                Some(subsurface)
            }
            None => None,
        };
        surface.commit();
        self.flush();

        trace!(target: "vulkan", %window, surface = ?raw, subsurface = subsurface.is_some(), "created wl_surface");
        self.lock_surfaces().insert(raw, ClientProxies { surface, subsurface });
        Ok(raw)
    }

    fn detach_client_surface(&self, surface: RawSurface) {
        let subsurface = self
            .lock_surfaces()
            .get_mut(&surface)
            .and_then(|proxies| proxies.subsurface.take());
        if let Some(subsurface) = subsurface {
            trace!(target: "vulkan", surface = ?surface, "detaching client surface");
            subsurface.destroy();
            self.flush();
        }
    }

    fn destroy_client_surface(&self, surface: RawSurface) {
        let Some(proxies) = self.lock_surfaces().remove(&surface) else {
            warn!(target: "vulkan", surface = ?surface, "destroying unknown client surface");
            return;
        };
        if let Some(subsurface) = proxies.subsurface {
            subsurface.destroy();
        }
        proxies.surface.destroy();
        self.flush();
    }

    fn commit(&self, surface: RawSurface) {
        match self.surface_from_raw(surface) {
            Ok(surface) => {
                surface.commit();
                self.flush();
            }
            Err(e) => warn!(target: "vulkan", "commit skipped: {}", e),
        }
    }
}
