//! Controller tunables.

use std::path::Path;

use haptic_core::nodes::{
    DEFAULT_GRAVITY_CUTOFF, DEFAULT_SHAKE_FULL_SCALE, DEFAULT_SHAKE_PERIOD_MS, DEFAULT_STEP_COUNT,
};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default minimum period between actuator writes, in milliseconds.
pub const DEFAULT_DEVICE_RATE_LIMIT_MS: u64 = 100;

/// Top-level configuration file.
///
/// Every section and key is optional in TOML; missing values take their
/// defaults.
///
/// ```toml
/// [controller]
/// device_rate_limit_ms = 100
/// default_dead_zone = 0.0
/// fallback_step_count = 2
///
/// [gravity]
/// length_cutoff = 0.0001
///
/// [shake]
/// period_ms = 50
/// full_scale = 25.0
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Per-device chain settings.
    pub controller: ControllerSection,
    /// Gravity source settings.
    pub gravity: GravitySection,
    /// Shake detector settings.
    pub shake: ShakeSection,
}

/// Per-device actuator chain settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSection {
    /// Minimum milliseconds between writes to one device.
    pub device_rate_limit_ms: u64,
    /// Quantizer hysteresis as a fraction of one step, in `[0, 0.5)`.
    pub default_dead_zone: f32,
    /// Step count used for motors that report fewer than two steps.
    pub fallback_step_count: u32,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            device_rate_limit_ms: DEFAULT_DEVICE_RATE_LIMIT_MS,
            default_dead_zone: 0.0,
            fallback_step_count: DEFAULT_STEP_COUNT,
        }
    }
}

/// Gravity source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravitySection {
    /// Readings at or below this length produce zero output.
    pub length_cutoff: f32,
}

impl Default for GravitySection {
    fn default() -> Self {
        Self {
            length_cutoff: DEFAULT_GRAVITY_CUTOFF,
        }
    }
}

/// Shake detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShakeSection {
    /// Peak-hold sampling period in milliseconds.
    pub period_ms: u64,
    /// Acceleration (m/s²) that maps to full intensity.
    pub full_scale: f32,
}

impl Default for ShakeSection {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_SHAKE_PERIOD_MS,
            full_scale: DEFAULT_SHAKE_FULL_SCALE,
        }
    }
}

impl ControlConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every value against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.controller;
        if c.device_rate_limit_ms == 0 {
            return Err(ConfigError::invalid(
                "controller.device_rate_limit_ms",
                "must be greater than 0",
            ));
        }
        if !(0.0..0.5).contains(&c.default_dead_zone) {
            return Err(ConfigError::invalid(
                "controller.default_dead_zone",
                format!("must be in [0, 0.5), got {}", c.default_dead_zone),
            ));
        }
        if c.fallback_step_count <= 1 {
            return Err(ConfigError::invalid(
                "controller.fallback_step_count",
                format!("must be greater than 1, got {}", c.fallback_step_count),
            ));
        }
        if self.gravity.length_cutoff.is_nan() || self.gravity.length_cutoff <= 0.0 {
            return Err(ConfigError::invalid(
                "gravity.length_cutoff",
                format!("must be positive, got {}", self.gravity.length_cutoff),
            ));
        }
        if self.shake.period_ms == 0 {
            return Err(ConfigError::invalid(
                "shake.period_ms",
                "must be greater than 0",
            ));
        }
        if self.shake.full_scale.is_nan() || self.shake.full_scale <= 0.0 {
            return Err(ConfigError::invalid(
                "shake.full_scale",
                format!("must be positive, got {}", self.shake.full_scale),
            ));
        }
        Ok(())
    }
}
