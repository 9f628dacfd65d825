//! Tracing subscriber setup for the archiver binary.
//!
//! `RUST_LOG` takes precedence over the configured level. When a log file is
//! configured, events are written through a non-blocking appender whose guard
//! must be held until the program exits, or buffered events are lost.

use crate::config::LoggingConfig;
use crate::error::{ArchiverError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the event filter: `RUST_LOG` if set, else the configured level.
pub fn env_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| ArchiverError::Config(format!("Invalid log level {:?}: {}", level, e)))
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(&config.level)?;

    let Some(path) = &config.file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .try_init()
            .map_err(|e| ArchiverError::Config(format!("Failed to install logger: {}", e)))?;
        return Ok(None);
    };

    let file_name = path.file_name().ok_or_else(|| {
        ArchiverError::Config(format!("Log file path {:?} has no file name", path))
    })?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| ArchiverError::io_at(dir, "create log directory", e))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|e| ArchiverError::Config(format!("Failed to install logger: {}", e)))?;

    Ok(Some(guard))
}
