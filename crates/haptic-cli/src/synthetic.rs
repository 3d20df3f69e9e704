//! Synthetic sensors for simulation.
//!
//! The backend only flips flags; a feeder thread reads them and posts
//! samples while a sensor is registered, the way a platform sensor service
//! would.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use haptic_control::{SensorBackend, SensorError, SensorKind};

/// Standard gravity in m/s².
const G: f32 = 9.81;

/// Which synthetic sensors are currently registered.
#[derive(Debug, Default)]
pub struct SensorFlags {
    gravity: AtomicBool,
    linear_acceleration: AtomicBool,
}

impl SensorFlags {
    fn flag(&self, kind: SensorKind) -> &AtomicBool {
        match kind {
            SensorKind::Gravity => &self.gravity,
            SensorKind::LinearAcceleration => &self.linear_acceleration,
        }
    }

    /// Whether samples for `kind` should be produced.
    pub fn is_enabled(&self, kind: SensorKind) -> bool {
        self.flag(kind).load(Ordering::Acquire)
    }
}

/// Backend that records registrations in shared [`SensorFlags`].
pub struct FlagSensorBackend {
    flags: Arc<SensorFlags>,
}

impl FlagSensorBackend {
    pub fn new(flags: Arc<SensorFlags>) -> Self {
        Self { flags }
    }
}

impl SensorBackend for FlagSensorBackend {
    fn register(&mut self, kind: SensorKind) -> Result<(), SensorError> {
        self.flags.flag(kind).store(true, Ordering::Release);
        tracing::info!(sensor = %kind, "synthetic sensor enabled");
        Ok(())
    }

    fn unregister(&mut self, kind: SensorKind) -> Result<(), SensorError> {
        self.flags.flag(kind).store(false, Ordering::Release);
        tracing::info!(sensor = %kind, "synthetic sensor disabled");
        Ok(())
    }
}

/// Gravity for a device slowly rolling around its Y axis, one turn every
/// `period_s` seconds.
pub fn gravity_at(t: f32, period_s: f32) -> [f32; 3] {
    let angle = TAU * t / period_s;
    [G * angle.sin(), 0.0, G * angle.cos()]
}

/// Shaking along X: an 8 Hz oscillation whose amplitude swells and fades
/// every two seconds, peaking at `peak` m/s².
pub fn shake_at(t: f32, peak: f32) -> [f32; 3] {
    let envelope = (TAU * 0.25 * t).sin().abs();
    [peak * envelope * (TAU * 8.0 * t).sin(), 0.0, 0.0]
}
