//! Configuration file locations
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/course-verify/`
//! - macOS: `~/Library/Application Support/course-verify/`
//! - Windows: `%APPDATA%\course-verify\`

use std::path::PathBuf;

/// Application name used for the config directory
const APP_NAME: &str = "course-verify";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
