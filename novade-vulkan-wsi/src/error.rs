//! Error types for the Wayland surface bridge.
//!
//! [`WsiError`] is what the driver-facing operations return. The capability
//! gate failures are fatal to driver initialization; the create-time failures
//! are recoverable and are usually reported to the Vulkan caller through
//! [`WsiError::vk_result`]. Surface destruction and presentation coordination
//! never produce errors.

use std::path::PathBuf;

use ash::vk;
use thiserror::Error;

use crate::compositor::CompositorError;
use crate::handle::WindowHandle;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WsiError>;

#[derive(Debug, Error)]
pub enum WsiError {
    /// The driver framework asked for a driver interface version this crate
    /// does not implement.
    #[error("version mismatch, driver framework wants {requested} but driver has {implemented}")]
    VersionMismatch { requested: u32, implemented: u32 },

    /// A required Vulkan entry point could not be resolved.
    #[error("required Vulkan entry point {0} not found")]
    EntryPointNotFound(&'static str),

    /// The window has no compositor surface record (destroyed or never mapped).
    #[error("no Wayland surface for window {0}")]
    NoSurfaceForWindow(WindowHandle),

    /// The compositor could not provide a client surface for the window.
    #[error("failed to create client surface for window {window}")]
    ClientSurfaceUnavailable {
        window: WindowHandle,
        #[source]
        source: CompositorError,
    },

    /// `vkCreateWaylandSurfaceKHR` failed; the result is carried verbatim.
    #[error("failed to create Vulkan Wayland surface: {0}")]
    GpuApiSurfaceCreationFailed(vk::Result),

    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging Initialization Failed: {0}")]
    Logging(String),
}

impl WsiError {
    /// Maps the error onto the `VkResult` a Vulkan caller expects.
    ///
    /// A missing compositor surface is reported as an out-of-host-memory
    /// error, one of the results a `vkCreate*SurfaceKHR` caller must already
    /// handle. [`crate::config::SurfaceConfig`] can pick a different code.
    pub fn vk_result(&self) -> vk::Result {
        match self {
            Self::GpuApiSurfaceCreationFailed(result) => *result,
            Self::NoSurfaceForWindow(_) | Self::ClientSurfaceUnavailable { .. } => {
                vk::Result::ERROR_OUT_OF_HOST_MEMORY
            }
            Self::VersionMismatch { .. } | Self::EntryPointNotFound(_) => {
                vk::Result::ERROR_INITIALIZATION_FAILED
            }
            Self::Config(_) | Self::Logging(_) => vk::Result::ERROR_INITIALIZATION_FAILED,
        }
    }
}

/// Errors raised while loading or validating [`crate::config::WsiConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file from {path:?}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
