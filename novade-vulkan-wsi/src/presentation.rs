//! Post-present compositor bookkeeping.
//!
//! A processed configure is only acknowledged together with the commit that
//! carries a frame rendered for it. Committing earlier would let the
//! compositor pair the new window geometry with stale pixels.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, trace};

use crate::compositor::{Compositor, SurfaceReconciler};
use crate::directory::{CompositorSurfaceRecord, ConfigureState, SurfaceDirectory};
use crate::handle::WindowHandle;

/// What a presentation callback did with the window's configure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// The window has no compositor surface anymore.
    WindowGone,
    /// No processed configure was waiting.
    NothingToApply,
    /// The configure with this serial was acknowledged and committed.
    Committed { serial: u32 },
    /// The reconciler rejected the configure; it stays processed for the next
    /// present.
    Deferred { serial: u32 },
}

pub struct PresentationCoordinator {
    directory: Arc<SurfaceDirectory>,
    compositor: Arc<dyn Compositor>,
    reconciler: Arc<dyn SurfaceReconciler>,
}

impl PresentationCoordinator {
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

    /// Runs after `vkQueuePresentKHR` returned for a swapchain on `window`.
    ///
    /// The present result does not gate anything: even an out-of-date present
    /// has reached the compositor surface.
    pub fn on_presented(&self, window: WindowHandle, result: vk::Result) -> PresentOutcome {
        trace!(target: "vulkan", %window, ?result, "surface presented");

        self.directory
            .with_record(window, |record| {
                self.reconciler.ensure_contents(record);
                self.apply_processed_configure(record)
            })
            .unwrap_or(PresentOutcome::WindowGone)
    }

    /// Applies a processed configure without a new frame.
    ///
    /// Never called by the bridge itself; for window managers that need to
    /// settle a configure on a window that stopped presenting.
    pub fn flush_configure(&self, window: WindowHandle) -> PresentOutcome {
        self.directory
            .with_record(window, |record| self.apply_processed_configure(record))
            .unwrap_or(PresentOutcome::WindowGone)
    }

    fn apply_processed_configure(&self, record: &mut CompositorSurfaceRecord) -> PresentOutcome {
        let ConfigureState::Processed(serial) = record.processing.state() else {
            return PresentOutcome::NothingToApply;
        };

        if !self.reconciler.reconfigure(record) {
            debug!(target: "vulkan", window = %record.window(), serial, "configure not reconciled, retrying on next present");
            return PresentOutcome::Deferred { serial };
        }

        self.compositor.commit(record.surface());
        record.finish_configure();
        trace!(target: "vulkan", window = %record.window(), serial, "committed configure");
        PresentOutcome::Committed { serial }
    }
}
