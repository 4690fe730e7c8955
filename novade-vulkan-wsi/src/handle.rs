//! Opaque handles shared between the window manager, the compositor transport
//! and the Vulkan side.
//!
//! None of these types are ever dereferenced by this crate. The raw pointer
//! wrappers exist so that `wl_display*` / `wl_surface*` values can be passed
//! across threads and stored in shared state, which bare `*mut c_void` does
//! not allow.

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

/// Identifies a platform window. Owned by the window manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(u64);

impl WindowHandle {
    /// Creates a window handle from its raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value of this handle.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Process-wide `wl_display*` as seen by the Vulkan loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawDisplay(NonNull<c_void>);

/// A `wl_surface*` owned by the compositor transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawSurface(NonNull<c_void>);

// The wrapped pointers are opaque tokens for libwayland and the Vulkan ICD,
// both of which are thread-safe for the requests issued through them.
unsafe impl Send for RawDisplay {}
unsafe impl Sync for RawDisplay {}
unsafe impl Send for RawSurface {}
unsafe impl Sync for RawSurface {}

impl RawDisplay {
    /// Wraps a non-null `wl_display*`.
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl RawSurface {
    /// Wraps a non-null `wl_surface*`.
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}
