//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/haptic/config.toml`
//! - macOS: `~/Library/Application Support/haptic/config.toml`
//! - Windows: `%APPDATA%\haptic\config.toml`

use std::path::{Path, PathBuf};

use crate::{ConfigError, ControlConfig};

/// Application name used for directory paths.
const APP_NAME: &str = "haptic";

/// File name of the main configuration file.
const CONFIG_FILE: &str = "config.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// Loads `path` if given, otherwise the default file if it exists,
/// otherwise the built-in defaults.
///
/// An explicitly given path must exist.
pub fn load_or_default(path: Option<&Path>) -> Result<ControlConfig, ConfigError> {
    match path {
        Some(path) => ControlConfig::load(path),
        None => {
            let default = default_config_path();
            if default.is_file() {
                ControlConfig::load(default)
            } else {
                Ok(ControlConfig::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_ends_with_app_and_file() {
        let path = default_config_path();
        assert!(path.ends_with("haptic/config.toml"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_or_default(Some(Path::new("/nonexistent/haptic.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
