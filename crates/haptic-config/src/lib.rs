//! Configuration for haptic control.
//!
//! Holds the tunables the controller reads at start-up: the per-device
//! write rate, quantizer hysteresis, the gravity cutoff and the shake
//! detector scale. Configuration is plain TOML, validated on load.
//!
//! # Example
//!
//! ```rust,no_run
//! use haptic_config::{ControlConfig, paths};
//!
//! let mut config = ControlConfig::load("haptic.toml").unwrap();
//! config.shake.full_scale = 15.0;
//! config.save(paths::default_config_path()).unwrap();
//! ```

mod control_config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

pub use control_config::{
    ControlConfig, ControllerSection, DEFAULT_DEVICE_RATE_LIMIT_MS, GravitySection, ShakeSection,
};
pub use error::ConfigError;
pub use paths::{default_config_path, load_or_default, user_config_dir};
