//! Configuration for the surface bridge.
//!
//! The configuration is a small TOML document. Every field has a default, so
//! a missing file or an empty document yields [`WsiConfig::default`]. Unknown
//! fields are rejected.
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "json"
//! file_path = "/tmp/novade-wsi.log"
//!
//! [surface]
//! missing_surface_error = "surface_lost"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use ash::vk;
use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable holding the path of the configuration file.
pub const CONFIG_PATH_ENV: &str = "NOVADE_WSI_CONFIG";

mod defaults {
    use super::{LoggingConfig, MissingSurfaceError, SurfaceConfig};
    use std::path::PathBuf;

    pub(super) fn default_log_level() -> String {
        "info".to_string()
    }

    pub(super) fn default_log_file_path() -> Option<PathBuf> {
        None
    }

    pub(super) fn default_log_format() -> String {
        "text".to_string()
    }

    pub(super) fn default_logging_config() -> LoggingConfig {
        LoggingConfig {
            level: default_log_level(),
            file_path: default_log_file_path(),
            format: default_log_format(),
        }
    }

    pub(super) fn default_missing_surface_error() -> MissingSurfaceError {
        MissingSurfaceError::OutOfHostMemory
    }

    pub(super) fn default_surface_config() -> SurfaceConfig {
        SurfaceConfig {
            missing_surface_error: default_missing_surface_error(),
        }
    }
}

/// Logging settings, consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of "trace", "debug", "info", "warn", "error" (case-insensitive).
    #[serde(default = "defaults::default_log_level")]
    pub level: String,
    /// Optional log file; rotated daily.
    #[serde(default = "defaults::default_log_file_path")]
    pub file_path: Option<PathBuf>,
    /// "text" or "json".
    #[serde(default = "defaults::default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        defaults::default_logging_config()
    }
}

/// The `VkResult` reported when a window has no usable compositor surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSurfaceError {
    OutOfHostMemory,
    SurfaceLost,
    InitializationFailed,
}

impl MissingSurfaceError {
    pub fn vk_result(self) -> vk::Result {
        match self {
            Self::OutOfHostMemory => vk::Result::ERROR_OUT_OF_HOST_MEMORY,
            Self::SurfaceLost => vk::Result::ERROR_SURFACE_LOST_KHR,
            Self::InitializationFailed => vk::Result::ERROR_INITIALIZATION_FAILED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceConfig {
    #[serde(default = "defaults::default_missing_surface_error")]
    pub missing_surface_error: MissingSurfaceError,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        defaults::default_surface_config()
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WsiConfig {
    #[serde(default = "defaults::default_logging_config")]
    pub logging: LoggingConfig,
    #[serde(default = "defaults::default_surface_config")]
    pub surface: SurfaceConfig,
}

impl WsiConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration at `path`. A missing file yields the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No configuration at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Loads the file named by [`CONFIG_PATH_ENV`], or the defaults if the
    /// variable is unset.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from_path(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        let level_lower = self.logging.level.to_lowercase();
        match level_lower.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => self.logging.level = level_lower,
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: '{}'. Must be one of trace, debug, info, warn, error.",
                    self.logging.level
                )));
            }
        }

        let format_lower = self.logging.format.to_lowercase();
        match format_lower.as_str() {
            "text" | "json" => self.logging.format = format_lower,
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: '{}'. Must be one of text, json.",
                    self.logging.format
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_yields_defaults() {
        let config = WsiConfig::from_toml_str("").unwrap();
        assert_eq!(config, WsiConfig::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.logging.file_path, None);
        assert_eq!(config.surface.missing_surface_error, MissingSurfaceError::OutOfHostMemory);
    }

    #[test]
    fn full_document_is_parsed_and_normalized() {
        let config = WsiConfig::from_toml_str(
            r#"
            [logging]
            level = "DEBUG"
            format = "Json"
            file_path = "/var/log/novade-wsi.log"

            [surface]
            missing_surface_error = "surface_lost"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.file_path, Some(PathBuf::from("/var/log/novade-wsi.log")));
        assert_eq!(
            config.surface.missing_surface_error.vk_result(),
            vk::Result::ERROR_SURFACE_LOST_KHR
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = WsiConfig::from_toml_str("[surface]\nretry = true\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn invalid_level_fails_validation() {
        let result = WsiConfig::from_toml_str("[logging]\nlevel = \"loud\"\n");
        match result {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("loud")),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn invalid_format_fails_validation() {
        let result = WsiConfig::from_toml_str("[logging]\nformat = \"xml\"\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn load_from_path_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[surface]\nmissing_surface_error = \"initialization_failed\"").unwrap();

        let config = WsiConfig::load_from_path(file.path()).unwrap();
        assert_eq!(
            config.surface.missing_surface_error,
            MissingSurfaceError::InitializationFailed
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = WsiConfig::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, WsiConfig::default());
    }

    #[test]
    fn unreadable_path_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        // Reading a directory as a file fails with something other than NotFound.
        let result = WsiConfig::load_from_path(dir.path());
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
