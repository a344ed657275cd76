//! File logging via tracing
//!
//! The terminal is the program's output, so logs only ever go to a file and
//! only when asked for.

use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install the global subscriber. Returns `false` when logging is off.
pub fn init(config: &LogConfig) -> io::Result<bool> {
    let Some(filter) = config.filter.as_deref() else {
        return Ok(false);
    };
    let filter = EnvFilter::try_new(filter).map_err(io::Error::other)?;

    let path = config.file.clone().unwrap_or_else(LogConfig::default_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(io::Error::other)?;

    tracing::info!(path = %path.display(), "logging started");
    Ok(true)
}
