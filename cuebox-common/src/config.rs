//! Configuration file resolution and TOML loading
//!
//! Config file location follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`<config_dir>/cuebox/config.toml`)
//! 4. None: callers fall back to compiled defaults
//!
//! A missing or unreadable configuration file is never fatal. Callers get the
//! defaults plus a warning in the log.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CUEBOX_CONFIG";

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve which config file to read, if any
///
/// Returns `None` when neither an explicit path nor a per-user config exists.
/// An explicit path (CLI or environment) is returned even when the file does
/// not exist so the loader can warn about it.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    default_config_path().filter(|path| path.exists())
}

/// Platform config file location (`~/.config/cuebox/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cuebox").join("config.toml"))
}

/// Parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let value = toml::from_str::<T>(&content)?;
    Ok(value)
}

/// Parse a TOML file into `T`, falling back to `T::default()`
///
/// Missing files and parse errors are logged and degrade to defaults.
pub fn load_toml_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> T {
    let Some(path) = path else {
        info!("No config file found, using built-in defaults");
        return T::default();
    };

    match load_toml::<T>(path) {
        Ok(value) => {
            info!("Loaded configuration from {}", path.display());
            value
        }
        Err(Error::Io(e)) => {
            warn!(
                "Config file {} could not be read ({}), using built-in defaults",
                path.display(),
                e
            );
            T::default()
        }
        Err(e) => {
            warn!(
                "Config file {} is invalid ({}), using built-in defaults",
                path.display(),
                e
            );
            T::default()
        }
    }
}
