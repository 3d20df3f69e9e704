//! Event fan-out to observers.
//!
//! Observers register an [`EventListener`]. Delivery is best effort: a
//! listener whose channel is gone is dropped on the spot, a full one just
//! misses that event.

use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;
use thiserror::Error;

use crate::device::DeviceId;

/// Lifecycle transition of a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceEventKind {
    /// Connected and wired into the graph.
    Online,
    /// Disconnected; may return.
    Offline,
    /// Gone for good.
    Deleted,
}

/// A device changed state.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceEvent {
    /// What happened.
    pub kind: DeviceEventKind,
    /// Which device.
    pub device_id: DeviceId,
    /// Display name at the time of the event.
    pub name: String,
    /// Motor count, when known.
    pub motors: Option<usize>,
}

/// New actuator values for a device.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceOutputEvent {
    /// Which device.
    pub device_id: DeviceId,
    /// One value per motor, in [0, 1].
    pub motors: Vec<f32>,
}

/// Everything observers can be told.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlEvent {
    /// Device lifecycle.
    Device(DeviceEvent),
    /// Actuator write.
    Output(DeviceOutputEvent),
    /// A provider could not start without a permission grant.
    PermissionRequired {
        /// Provider uri.
        provider: String,
        /// Platform permission name.
        permission: String,
    },
}

/// Why an event did not reach a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The listener is gone and should be removed.
    #[error("listener disconnected")]
    Disconnected,

    /// The listener is alive but not keeping up.
    #[error("listener queue is full")]
    Full,
}

/// Receives control events.
pub trait EventListener: Send + Sync {
    /// Hands over one event without blocking.
    fn deliver(&self, event: &ControlEvent) -> Result<(), DeliveryError>;
}

impl EventListener for Sender<ControlEvent> {
    fn deliver(&self, event: &ControlEvent) -> Result<(), DeliveryError> {
        self.try_send(event.clone()).map_err(|err| match err {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Disconnected(_) => DeliveryError::Disconnected,
        })
    }
}

/// Registered listeners.
#[derive(Default)]
pub struct EventBroadcaster {
    listeners: Mutex<Vec<Arc<dyn EventListener>>>,
}

fn same_listener(a: &Arc<dyn EventListener>, b: &Arc<dyn EventListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl EventBroadcaster {
    /// Creates an empty broadcaster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener. Returns `false` if it was already registered.
    pub fn register(&self, listener: Arc<dyn EventListener>) -> bool {
        let mut listeners = self.listeners.lock();
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unregister(&self, listener: &Arc<dyn EventListener>) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Whether nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every listener.
    ///
    /// The lock is not held while delivering, so listeners may register or
    /// unregister from inside `deliver`.
    pub fn broadcast(&self, event: &ControlEvent) {
        let snapshot = self.listeners.lock().clone();
        for listener in &snapshot {
            self.send_to(listener, event);
        }
    }

    /// Delivers `event` to one listener, dropping it if disconnected.
    pub fn send_to(&self, listener: &Arc<dyn EventListener>, event: &ControlEvent) {
        match listener.deliver(event) {
            Ok(()) => {}
            Err(DeliveryError::Full) => tracing::trace!("listener full, event skipped"),
            Err(DeliveryError::Disconnected) => {
                tracing::debug!("listener disappeared, removing");
                self.unregister(listener);
            }
        }
    }
}
