//! In-process provider with one fake device.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::device::{
    DeviceId, DeviceInfo, DeviceProvider, DeviceProviderListener, MotorInfo, ProviderError,
    ProviderFactory,
};

/// Uri reported by [`DebugProviderFactory::default`].
pub const DEBUG_PROVIDER_URI: &str = "debug://";

/// Provider exposing a single two-motor "Test device".
///
/// Connecting reports the device online, disconnecting reports it deleted.
/// Motor writes are logged and the last one is kept for inspection.
pub struct DebugDeviceProvider {
    uri: String,
    device: DeviceInfo,
    listener: Weak<dyn DeviceProviderListener>,
    connected: AtomicBool,
    last_values: Mutex<Vec<f32>>,
    writes: AtomicU64,
}

impl DebugDeviceProvider {
    /// Creates a disconnected provider.
    pub fn new(uri: impl Into<String>, listener: Weak<dyn DeviceProviderListener>) -> Self {
        let device = DeviceInfo {
            id: DeviceId(1),
            display_name: "Test device".to_owned(),
            motors: vec![MotorInfo { steps: 20 }; 2],
        };
        Self {
            uri: uri.into(),
            last_values: Mutex::new(vec![0.0; device.motor_count()]),
            device,
            listener,
            connected: AtomicBool::new(false),
            writes: AtomicU64::new(0),
        }
    }

    /// Whether [`connect`](DeviceProvider::connect) is in effect.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Values of the most recent write.
    pub fn last_values(&self) -> Vec<f32> {
        self.last_values.lock().clone()
    }

    /// Number of writes received.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn check_device(&self, device: DeviceId) -> Result<(), ProviderError> {
        if device == self.device.id {
            Ok(())
        } else {
            Err(ProviderError::UnknownDevice(device))
        }
    }
}

impl DeviceProvider for DebugDeviceProvider {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        if self.is_connected() {
            vec![self.device.clone()]
        } else {
            Vec::new()
        }
    }

    fn connect(&self) -> Result<(), ProviderError> {
        let was_connected = self.connected.swap(true, Ordering::AcqRel);
        if !was_connected && let Some(listener) = self.listener.upgrade() {
            listener.device_online(&self.uri, self.device.clone());
        }
        Ok(())
    }

    fn disconnect(&self) -> Result<(), ProviderError> {
        let was_connected = self.connected.swap(false, Ordering::AcqRel);
        if was_connected && let Some(listener) = self.listener.upgrade() {
            listener.device_deleted(&self.uri, self.device.id);
        }
        Ok(())
    }

    fn initiate_scan(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn set_motor(&self, device: DeviceId, motor: usize, value: f32) -> Result<(), ProviderError> {
        self.check_device(device)?;
        let mut last = self.last_values.lock();
        let slot = last
            .get_mut(motor)
            .ok_or(ProviderError::MotorOutOfRange { device, motor })?;
        *slot = value;
        self.writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%device, motor, value, "debug motor set");
        Ok(())
    }

    fn set_motors(&self, device: DeviceId, values: &[f32]) -> Result<(), ProviderError> {
        self.check_device(device)?;
        let mut last = self.last_values.lock();
        for (slot, &value) in last.iter_mut().zip(values) {
            *slot = value;
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%device, ?values, "debug motors set");
        Ok(())
    }
}

/// Creates [`DebugDeviceProvider`]s.
#[derive(Debug, Clone)]
pub struct DebugProviderFactory {
    uri: String,
}

impl DebugProviderFactory {
    /// Factory for providers reporting `uri`.
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

impl Default for DebugProviderFactory {
    fn default() -> Self {
        Self::new(DEBUG_PROVIDER_URI)
    }
}

impl ProviderFactory for DebugProviderFactory {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn create(
        &self,
        listener: Weak<dyn DeviceProviderListener>,
    ) -> Result<Arc<dyn DeviceProvider>, ProviderError> {
        Ok(Arc::new(DebugDeviceProvider::new(self.uri.clone(), listener)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        events: Mutex<Vec<String>>,
    }

    impl DeviceProviderListener for Log {
        fn device_online(&self, uri: &str, device: DeviceInfo) {
            self.events
                .lock()
                .push(format!("online {uri} {} {}", device.id, device.display_name));
        }

        fn device_offline(&self, uri: &str, device: DeviceId) {
            self.events.lock().push(format!("offline {uri} {device}"));
        }

        fn device_deleted(&self, uri: &str, device: DeviceId) {
            self.events.lock().push(format!("deleted {uri} {device}"));
        }
    }

    fn provider() -> (Arc<Log>, DebugDeviceProvider) {
        let log = Arc::new(Log::default());
        let weak = Arc::downgrade(&log);
        (log, DebugDeviceProvider::new(DEBUG_PROVIDER_URI, weak))
    }

    #[test]
    fn connect_and_disconnect_report_once() {
        let (log, provider) = provider();
        provider.connect().unwrap();
        provider.connect().unwrap();
        assert_eq!(provider.devices().len(), 1);
        provider.disconnect().unwrap();
        provider.disconnect().unwrap();
        assert!(provider.devices().is_empty());
        assert_eq!(
            *log.events.lock(),
            vec![
                "online debug:// #1 Test device".to_owned(),
                "deleted debug:// #1".to_owned(),
            ]
        );
    }

    #[test]
    fn device_has_two_twenty_step_motors() {
        let (_log, provider) = provider();
        provider.connect().unwrap();
        let device = &provider.devices()[0];
        assert_eq!(device.motors, vec![MotorInfo { steps: 20 }; 2]);
    }

    #[test]
    fn writes_are_recorded() {
        let (_log, provider) = provider();
        provider.set_motors(DeviceId(1), &[0.25, 0.5]).unwrap();
        provider.set_motor(DeviceId(1), 0, 1.0).unwrap();
        assert_eq!(provider.last_values(), vec![1.0, 0.5]);
        assert_eq!(provider.write_count(), 2);
        assert_eq!(
            provider.set_motors(DeviceId(2), &[0.0]),
            Err(ProviderError::UnknownDevice(DeviceId(2)))
        );
        assert!(provider.set_motor(DeviceId(1), 2, 0.0).is_err());
    }

    #[test]
    fn dropped_listener_is_ignored() {
        let (log, provider) = provider();
        drop(log);
        provider.connect().unwrap();
        assert!(provider.is_connected());
    }
}
