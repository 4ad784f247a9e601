//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | Windows | Linux |
//! |---------|---------|-------|
//! | App data | `%APPDATA%\autogame\` | `~/.local/share/autogame/` |
//! | Config | `%APPDATA%\autogame\` | `~/.config/autogame/` |
//!
//! # Environment Overrides
//!
//! - `AUTOGAME_DATA_DIR`: overrides [`data_dir`]
//! - `AUTOGAME_CONFIG_DIR`: overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the task and account collections, template resources, logs and
/// debug screenshots.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("AUTOGAME_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("autogame"))
        .unwrap_or_else(|| std::env::temp_dir().join("autogame-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("AUTOGAME_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("autogame"))
        .unwrap_or_else(|| std::env::temp_dir().join("autogame-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Template image root (`data_dir()/resources/`).
#[must_use]
pub fn resources_dir() -> PathBuf {
    data_dir().join("resources")
}

/// Debug screenshot root (`data_dir()/debug-screenshots/`).
#[must_use]
pub fn debug_screenshots_dir() -> PathBuf {
    data_dir().join("debug-screenshots")
}

/// Task collection file name inside a data directory.
pub const TASKS_FILE: &str = "tasks.json";

/// Account collection file name inside a data directory.
pub const ACCOUNTS_FILE: &str = "accounts.json";
