//! Configuration for kilo
//!
//! There is no config file. Defaults are built in; logging can be switched
//! on through `KILO_LOG` (filter) and `--log-file`/`KILO_LOG_FILE` (path).

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::terminal::ReadTiming;

/// Env var holding a tracing filter, e.g. `KILO_LOG=debug`
pub const LOG_FILTER_ENV: &str = "KILO_LOG";

/// Filter used when a log file is given without `KILO_LOG`
const DEFAULT_LOG_FILTER: &str = "info";

/// Kilo configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// VMIN/VTIME applied in raw mode
    pub timing: ReadTiming,

    /// Byte that ends the read loop
    pub quit_byte: u8,

    /// Log settings
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: ReadTiming::default(),
            quit_byte: b'q',
            log: LogConfig::default(),
        }
    }
}

/// Where and how much to log. Both `None` means logging is off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// tracing `EnvFilter` directive
    pub filter: Option<String>,

    /// Log file path
    pub file: Option<PathBuf>,
}

impl Config {
    /// Build config from defaults, the environment, and an optional log path
    pub fn load(log_file: Option<PathBuf>) -> Self {
        Self::from_parts(env::var(LOG_FILTER_ENV).ok(), log_file)
    }

    fn from_parts(filter: Option<String>, file: Option<PathBuf>) -> Self {
        let filter = filter.filter(|f| !f.trim().is_empty());
        let log = match (filter, file) {
            (None, None) => LogConfig::default(),
            (filter, file) => LogConfig {
                filter: Some(filter.unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())),
                file: Some(file.unwrap_or_else(LogConfig::default_path)),
            },
        };
        Self {
            log,
            ..Self::default()
        }
    }
}

impl LogConfig {
    pub fn enabled(&self) -> bool {
        self.filter.is_some()
    }

    /// Default log file path
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(env::temp_dir)
            .join("kilo")
            .join("kilo.log")
    }
}
