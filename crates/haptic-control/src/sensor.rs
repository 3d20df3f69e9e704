//! Sensor subscriptions.
//!
//! The controller only wants sensor data while a source node is reachable
//! from some device. [`SensorHub`] tracks two things per sensor: whether
//! the graph wants it, and whether the controller is started. The backend
//! is registered exactly while both hold.

use std::fmt;

use thiserror::Error;

/// Physical sensors the controller can consume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorKind {
    /// Gravity vector in m/s².
    Gravity,
    /// Acceleration with gravity removed, in m/s².
    LinearAcceleration,
}

impl SensorKind {
    /// Both kinds.
    pub const ALL: [Self; 2] = [Self::Gravity, Self::LinearAcceleration];

    fn slot(self) -> usize {
        match self {
            Self::Gravity => 0,
            Self::LinearAcceleration => 1,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gravity => "gravity",
            Self::LinearAcceleration => "linear-acceleration",
        })
    }
}

/// A backend could not change a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// The platform has no such sensor.
    #[error("no {0} sensor available")]
    Unavailable(SensorKind),

    /// The platform refused the request.
    #[error("sensor backend failed: {0}")]
    Backend(String),
}

/// Platform hook that turns sensor delivery on and off.
///
/// Called from the worker thread only. Delivered samples go back through
/// [`ToyController::on_sensor_event`](crate::ToyController::on_sensor_event).
pub trait SensorBackend: Send {
    /// Starts delivery for `kind`.
    fn register(&mut self, kind: SensorKind) -> Result<(), SensorError>;

    /// Stops delivery for `kind`.
    fn unregister(&mut self, kind: SensorKind) -> Result<(), SensorError>;
}

/// Backend that accepts every request and delivers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSensorBackend;

impl SensorBackend for NullSensorBackend {
    fn register(&mut self, _kind: SensorKind) -> Result<(), SensorError> {
        Ok(())
    }

    fn unregister(&mut self, _kind: SensorKind) -> Result<(), SensorError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SensorRegistration {
    wanted: bool,
    registered: bool,
}

/// Lifecycle-aware subscription state for every [`SensorKind`].
pub struct SensorHub {
    backend: Box<dyn SensorBackend>,
    started: bool,
    registrations: [SensorRegistration; 2],
}

impl SensorHub {
    /// Creates a stopped hub with nothing wanted.
    pub fn new(backend: Box<dyn SensorBackend>) -> Self {
        Self {
            backend,
            started: false,
            registrations: [SensorRegistration::default(); 2],
        }
    }

    /// Marks whether the graph currently needs `kind`.
    pub fn set_wanted(&mut self, kind: SensorKind, wanted: bool) {
        let registration = &mut self.registrations[kind.slot()];
        if registration.wanted == wanted {
            return;
        }
        registration.wanted = wanted;
        tracing::debug!(sensor = %kind, wanted, "sensor demand changed");
        self.sync(kind);
    }

    /// Enters the started state, registering everything wanted.
    pub fn start(&mut self) {
        self.started = true;
        SensorKind::ALL.into_iter().for_each(|kind| self.sync(kind));
    }

    /// Leaves the started state, unregistering everything.
    pub fn stop(&mut self) {
        self.started = false;
        SensorKind::ALL.into_iter().for_each(|kind| self.sync(kind));
    }

    /// Whether the hub is started.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether the graph needs `kind`.
    pub fn is_wanted(&self, kind: SensorKind) -> bool {
        self.registrations[kind.slot()].wanted
    }

    /// Whether the backend is currently delivering `kind`.
    pub fn is_registered(&self, kind: SensorKind) -> bool {
        self.registrations[kind.slot()].registered
    }

    fn sync(&mut self, kind: SensorKind) {
        let registration = &mut self.registrations[kind.slot()];
        let target = self.started && registration.wanted;
        if target == registration.registered {
            return;
        }
        let result = if target {
            self.backend.register(kind)
        } else {
            self.backend.unregister(kind)
        };
        match result {
            Ok(()) => {
                registration.registered = target;
                tracing::debug!(sensor = %kind, registered = target, "sensor subscription");
            }
            Err(err) => tracing::warn!(sensor = %kind, %err, "sensor subscription change failed"),
        }
    }
}

impl fmt::Debug for SensorHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorHub")
            .field("started", &self.started)
            .field("registrations", &self.registrations)
            .finish_non_exhaustive()
    }
}
