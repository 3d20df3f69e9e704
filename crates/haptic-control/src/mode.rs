//! Per-motor control modes.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// What drives a motor.
///
/// A mode is not stored anywhere; it is read back from the edge bound to
/// the device's output slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SimpleControlMode {
    /// User-set intensity.
    Manual,
    /// Tilt toward the X axis.
    GravityX,
    /// Tilt toward the Y axis.
    GravityY,
    /// Tilt toward the Z axis.
    GravityZ,
    /// Shake intensity from linear acceleration.
    Shake,
}

impl SimpleControlMode {
    /// Every mode, in id order.
    pub const ALL: [Self; 5] = [
        Self::Manual,
        Self::GravityX,
        Self::GravityY,
        Self::GravityZ,
        Self::Shake,
    ];

    /// Stable numeric id.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Looks a mode up by its numeric id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Kebab-case name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::GravityX => "gravity-x",
            Self::GravityY => "gravity-y",
            Self::GravityZ => "gravity-z",
            Self::Shake => "shake",
        }
    }

    /// One-line description.
    pub fn description(self) -> &'static str {
        match self {
            Self::Manual => "intensity set by hand",
            Self::GravityX => "tilt toward +X raises intensity",
            Self::GravityY => "tilt toward +Y raises intensity",
            Self::GravityZ => "lying face up raises intensity",
            Self::Shake => "shaking the device raises intensity",
        }
    }
}

impl fmt::Display for SimpleControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A string that names no control mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown control mode '{0}'")]
pub struct ParseModeError(pub String);

impl FromStr for SimpleControlMode {
    type Err = ParseModeError;

    /// Accepts the kebab-case name, with `_` in place of `-` and in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ParseModeError(s.to_owned()))
    }
}
