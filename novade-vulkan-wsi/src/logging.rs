//! Logging setup for the surface bridge.
//!
//! All components log through `tracing` under the `vulkan` target. The host
//! process normally installs its own subscriber; these helpers are for
//! standalone use of the driver and for tests.

use std::fs;
use std::io::stdout;
use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::{Result, WsiError};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps the file writer alive so buffered lines get flushed.
static LOG_WORKER_GUARD: Lazy<Mutex<Option<WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

/// Installs a stderr subscriber filtered by `RUST_LOG`, defaulting to info.
///
/// Does nothing if a global subscriber is already set.
pub fn init_minimal_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .try_init();
}

fn create_file_layer(log_path: &Path, format: &str) -> Result<(BoxedLayer, WorkerGuard)> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                WsiError::Logging(format!("Failed to create log directory {:?}: {}", parent, e))
            })?;
        }
    }

    let file_appender = tracing_appender::rolling::daily(
        log_path.parent().unwrap_or_else(|| Path::new(".")),
        log_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("novade-vulkan-wsi.log")),
    );
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let layer = match format {
        "json" => fmt::layer().json().with_writer(writer).with_ansi(false).boxed(),
        _ => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
    };
    Ok((layer, guard))
}

fn level_filter(level: &str) -> Result<String> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        invalid => {
            return Err(WsiError::Logging(format!("Invalid log level in config: {}", invalid)));
        }
    };
    Ok(level.to_string())
}

/// Installs the global subscriber described by `config`: a stdout layer plus
/// an optional daily-rolling file layer.
///
/// A subscriber can only be installed once per process. With `is_reload` set,
/// an already installed subscriber is not an error: it keeps running with its
/// original outputs, including its file, and the new settings are discarded.
pub fn init_logging(config: &LoggingConfig, is_reload: bool) -> Result<()> {
    let filter = level_filter(&config.level)?;
    let format = config.format.to_lowercase();

    let stdout_layer = match format.as_str() {
        "json" => fmt::layer()
            .json()
            .with_writer(stdout)
            .with_ansi(false)
            .with_filter(EnvFilter::new(&filter))
            .boxed(),
        _ => fmt::layer()
            .with_writer(stdout)
            .with_ansi(atty::is(atty::Stream::Stdout))
            .with_filter(EnvFilter::new(&filter))
            .boxed(),
    };

    let mut layers: Vec<BoxedLayer> = vec![stdout_layer];
    let mut file_guard = None;
    if let Some(log_path) = &config.file_path {
        let (file_layer, guard) = create_file_layer(log_path, &format)?;
        layers.push(file_layer.with_filter(EnvFilter::new(&filter)).boxed());
        file_guard = Some(guard);
    }

    match Registry::default().with(layers).try_init() {
        Ok(()) => {
            match LOG_WORKER_GUARD.lock() {
                Ok(mut slot) => *slot = file_guard,
                Err(e) => {
                    eprintln!("[ERROR] Failed to lock LOG_WORKER_GUARD: {}. Log flushing may be affected.", e)
                }
            }
            Ok(())
        }
        // The unused guard is dropped here; the installed writer keeps its own.
        Err(e) if is_reload => {
            eprintln!("[INFO] Logging re-initialization attempted, previous subscriber persists: {}", e);
            Ok(())
        }
        Err(e) => Err(WsiError::Logging(format!(
            "Failed to set global tracing subscriber. Was it already initialized? Error: {}",
            e
        ))),
    }
}
