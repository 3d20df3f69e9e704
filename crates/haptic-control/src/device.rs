//! Device and provider interfaces.
//!
//! A provider owns the transport to a family of devices (a radio stack, a
//! debug stub) and reports devices coming and going to its listener. The
//! control layer never talks to a transport directly.

use std::fmt;
use std::sync::{Arc, Weak};

use thiserror::Error;

/// Identifies a device. Providers number their own devices; the service
/// maps those to process-wide ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One actuator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotorInfo {
    /// Number of distinct intensity levels the hardware supports.
    pub steps: u32,
}

/// A device as reported by its provider.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceInfo {
    /// Device id.
    pub id: DeviceId,
    /// Human-readable name.
    pub display_name: String,
    /// Actuators, in index order.
    pub motors: Vec<MotorInfo>,
}

impl DeviceInfo {
    /// Number of motors.
    pub fn motor_count(&self) -> usize {
        self.motors.len()
    }
}

/// Provider-side failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The platform needs the user to grant a permission first.
    #[error("permission required: {0}")]
    PermissionRequired(String),

    /// The provider does not know this device.
    #[error("unknown device {0}")]
    UnknownDevice(DeviceId),

    /// The device has no motor at this index.
    #[error("motor {motor} out of range for device {device}")]
    MotorOutOfRange {
        /// Device addressed.
        device: DeviceId,
        /// Requested motor index.
        motor: usize,
    },

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A source of devices.
///
/// Implementations are shared between the service and the worker's sink
/// callbacks, so every method takes `&self`.
pub trait DeviceProvider: Send + Sync {
    /// Stable identifier, e.g. `debug://`.
    fn uri(&self) -> &str;

    /// Devices currently connected.
    fn devices(&self) -> Vec<DeviceInfo>;

    /// Opens the transport. Devices found are reported to the listener.
    fn connect(&self) -> Result<(), ProviderError>;

    /// Closes the transport.
    fn disconnect(&self) -> Result<(), ProviderError>;

    /// Looks for new devices.
    fn initiate_scan(&self) -> Result<(), ProviderError>;

    /// Drives one motor to `value` in [0, 1].
    fn set_motor(&self, device: DeviceId, motor: usize, value: f32) -> Result<(), ProviderError>;

    /// Drives every motor of a device at once.
    fn set_motors(&self, device: DeviceId, values: &[f32]) -> Result<(), ProviderError> {
        for (motor, &value) in values.iter().enumerate() {
            self.set_motor(device, motor, value)?;
        }
        Ok(())
    }
}

/// Receives device lifecycle reports from providers.
///
/// May be called from any thread.
pub trait DeviceProviderListener: Send + Sync {
    /// A device connected.
    fn device_online(&self, provider_uri: &str, device: DeviceInfo);

    /// A device dropped its connection but may come back.
    fn device_offline(&self, provider_uri: &str, device: DeviceId);

    /// A device is gone for good.
    fn device_deleted(&self, provider_uri: &str, device: DeviceId);
}

/// Creates providers.
pub trait ProviderFactory {
    /// The uri the created provider will report.
    fn uri(&self) -> &str;

    /// Builds a provider reporting to `listener`.
    ///
    /// Fails with [`ProviderError::PermissionRequired`] when the platform
    /// must grant access first.
    fn create(
        &self,
        listener: Weak<dyn DeviceProviderListener>,
    ) -> Result<Arc<dyn DeviceProvider>, ProviderError>;
}
