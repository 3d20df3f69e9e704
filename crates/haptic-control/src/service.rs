//! Glue between providers, the controller and observers.
//!
//! [`ControlService`] is the provider listener. Devices reported online are
//! wired into the controller with a sink that writes back to the provider
//! and broadcasts the values; devices going away are torn down. Observers
//! get every event and, on registration, a snapshot of the current state.
//!
//! Providers number their devices independently. The service assigns each
//! `(provider uri, provider device id)` pair a process-wide [`DeviceId`]
//! that stays stable across reconnects.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::controller::ToyController;
use crate::device::{
    DeviceId, DeviceInfo, DeviceProvider, DeviceProviderListener, ProviderError, ProviderFactory,
};
use crate::error::ControlError;
use crate::events::{
    ControlEvent, DeviceEvent, DeviceEventKind, DeviceOutputEvent, EventBroadcaster,
    EventListener,
};

/// A device the service has seen during this run.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownDevice {
    /// Process-wide id.
    pub id: DeviceId,
    /// Uri of the owning provider.
    pub provider: String,
    /// Id within the provider.
    pub provider_device: DeviceId,
    /// Last reported name.
    pub name: String,
    /// Last reported motor count.
    pub motors: usize,
    /// Whether the device is currently wired into the controller.
    pub online: bool,
}

#[derive(Debug, Default)]
struct Registry {
    ids: BTreeMap<(String, DeviceId), DeviceId>,
    devices: BTreeMap<DeviceId, KnownDevice>,
    next_id: u64,
}

impl Registry {
    fn online(&mut self, uri: &str, info: &DeviceInfo) -> DeviceId {
        let key = (uri.to_owned(), info.id);
        let id = match self.ids.get(&key) {
            Some(&id) => id,
            None => {
                self.next_id += 1;
                let id = DeviceId(self.next_id);
                self.ids.insert(key, id);
                id
            }
        };
        self.devices.insert(
            id,
            KnownDevice {
                id,
                provider: uri.to_owned(),
                provider_device: info.id,
                name: info.display_name.clone(),
                motors: info.motor_count(),
                online: true,
            },
        );
        id
    }

    fn offline(&mut self, uri: &str, local: DeviceId) -> Option<KnownDevice> {
        let id = *self.ids.get(&(uri.to_owned(), local))?;
        let device = self.devices.get_mut(&id)?;
        device.online = false;
        Some(device.clone())
    }

    fn delete(&mut self, uri: &str, local: DeviceId) -> Option<KnownDevice> {
        let id = self.ids.remove(&(uri.to_owned(), local))?;
        let mut device = self.devices.remove(&id)?;
        device.online = false;
        Some(device)
    }
}

/// Owns providers, routes device events, fans out to observers.
pub struct ControlService {
    controller: ToyController,
    events: Arc<EventBroadcaster>,
    providers: Mutex<BTreeMap<String, Arc<dyn DeviceProvider>>>,
    registry: Mutex<Registry>,
}

impl ControlService {
    /// Wraps a running controller.
    pub fn new(controller: ToyController) -> Arc<Self> {
        Arc::new(Self {
            controller,
            events: Arc::new(EventBroadcaster::new()),
            providers: Mutex::new(BTreeMap::new()),
            registry: Mutex::new(Registry::default()),
        })
    }

    /// The controller devices are wired into.
    pub fn controller(&self) -> &ToyController {
        &self.controller
    }

    /// Creates a provider through `factory` and keeps it.
    ///
    /// A permission failure is broadcast as
    /// [`ControlEvent::PermissionRequired`] and returned. The provider is
    /// not connected; call [`DeviceProvider::connect`] on the result.
    pub fn add_provider(
        self: &Arc<Self>,
        factory: &dyn ProviderFactory,
    ) -> Result<Arc<dyn DeviceProvider>, ProviderError> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let listener: Weak<dyn DeviceProviderListener> = weak;
        let provider = match factory.create(listener) {
            Ok(provider) => provider,
            Err(ProviderError::PermissionRequired(permission)) => {
                tracing::warn!(provider = factory.uri(), %permission, "provider needs permission");
                self.events.broadcast(&ControlEvent::PermissionRequired {
                    provider: factory.uri().to_owned(),
                    permission: permission.clone(),
                });
                return Err(ProviderError::PermissionRequired(permission));
            }
            Err(err) => return Err(err),
        };
        let uri = provider.uri().to_owned();
        let replaced = self
            .providers
            .lock()
            .insert(uri.clone(), Arc::clone(&provider));
        if let Some(old) = replaced
            && let Err(err) = old.disconnect()
        {
            tracing::warn!(provider = %uri, %err, "replaced provider failed to disconnect");
        }
        tracing::info!(provider = %uri, "provider added");
        Ok(provider)
    }

    /// Disconnects and forgets a provider. Its devices are reported deleted
    /// by the provider itself.
    pub fn remove_provider(&self, uri: &str) -> Result<bool, ProviderError> {
        let Some(provider) = self.providers.lock().remove(uri) else {
            return Ok(false);
        };
        provider.disconnect()?;
        tracing::info!(provider = %uri, "provider removed");
        Ok(true)
    }

    /// A registered provider.
    pub fn provider(&self, uri: &str) -> Option<Arc<dyn DeviceProvider>> {
        self.providers.lock().get(uri).cloned()
    }

    /// Uris of every registered provider.
    pub fn provider_uris(&self) -> Vec<String> {
        self.providers.lock().keys().cloned().collect()
    }

    /// Every device seen during this run, in id order.
    pub fn known_devices(&self) -> Vec<KnownDevice> {
        self.registry.lock().devices.values().cloned().collect()
    }

    /// Ids of devices currently online.
    pub fn online_devices(&self) -> Vec<DeviceId> {
        self.registry
            .lock()
            .devices
            .values()
            .filter(|device| device.online)
            .map(|device| device.id)
            .collect()
    }

    /// Subscribes `listener` and sends it the current state.
    ///
    /// Registering the same listener twice is a no-op.
    pub fn register_listener(&self, listener: Arc<dyn EventListener>) -> Result<(), ControlError> {
        if !self.events.register(Arc::clone(&listener)) {
            return Ok(());
        }
        self.initial_sync(&listener)
    }

    /// Unsubscribes `listener`.
    pub fn unregister_listener(&self, listener: &Arc<dyn EventListener>) -> bool {
        self.events.unregister(listener)
    }

    /// Disconnects every provider and stops the controller.
    pub fn shutdown(&self) {
        let providers: Vec<_> = std::mem::take(&mut *self.providers.lock())
            .into_values()
            .collect();
        for provider in providers {
            if let Err(err) = provider.disconnect() {
                tracing::warn!(provider = provider.uri(), %err, "disconnect failed");
            }
        }
        self.controller.stop();
        tracing::info!("control service stopped");
    }

    fn initial_sync(&self, listener: &Arc<dyn EventListener>) -> Result<(), ControlError> {
        let devices = self.known_devices();
        let outputs = self.controller.current_outputs()?;
        for device in devices {
            let kind = if device.online {
                DeviceEventKind::Online
            } else {
                DeviceEventKind::Offline
            };
            tracing::trace!(device = %device.id, online = device.online, "syncing listener");
            self.events.send_to(
                listener,
                &ControlEvent::Device(DeviceEvent {
                    kind,
                    device_id: device.id,
                    name: device.name.clone(),
                    motors: Some(device.motors),
                }),
            );
            if let Some(values) = outputs.get(&device.id) {
                self.events.send_to(
                    listener,
                    &ControlEvent::Output(DeviceOutputEvent {
                        device_id: device.id,
                        motors: values.clone(),
                    }),
                );
            }
        }
        Ok(())
    }

    fn device_gone(&self, device: KnownDevice, kind: DeviceEventKind) {
        if let Err(err) = self.controller.remove_device(device.id) {
            tracing::warn!(device = %device.id, %err, "failed to queue device removal");
        }
        self.events.broadcast(&ControlEvent::Device(DeviceEvent {
            kind,
            device_id: device.id,
            name: device.name,
            motors: None,
        }));
    }
}

impl DeviceProviderListener for ControlService {
    fn device_online(&self, provider_uri: &str, device: DeviceInfo) {
        let Some(provider) = self.provider(provider_uri) else {
            tracing::warn!(provider = provider_uri, "device online from unknown provider");
            return;
        };
        let id = self.registry.lock().online(provider_uri, &device);
        let local = device.id;
        tracing::info!(device = %id, provider = provider_uri, %local, "device came online");

        let events = Arc::clone(&self.events);
        let write_back = move |values: &[f32]| {
            tracing::debug!(device = %id, ?values, "setting motors");
            if let Err(err) = provider.set_motors(local, values) {
                tracing::warn!(device = %id, %err, "motor write failed");
            }
            events.broadcast(&ControlEvent::Output(DeviceOutputEvent {
                device_id: id,
                motors: values.to_vec(),
            }));
        };
        let name = device.display_name.clone();
        let motors = device.motor_count();
        let info = DeviceInfo { id, ..device };
        if let Err(err) = self.controller.add_device(info, write_back) {
            tracing::warn!(device = %id, %err, "failed to queue device");
            return;
        }

        self.events.broadcast(&ControlEvent::Device(DeviceEvent {
            kind: DeviceEventKind::Online,
            device_id: id,
            name,
            motors: Some(motors),
        }));
    }

    fn device_offline(&self, provider_uri: &str, device: DeviceId) {
        let known = self.registry.lock().offline(provider_uri, device);
        match known {
            Some(known) => {
                tracing::info!(device = %known.id, provider = provider_uri, "device went offline");
                self.device_gone(known, DeviceEventKind::Offline);
            }
            None => tracing::debug!(provider = provider_uri, %device, "offline for unknown device"),
        }
    }

    fn device_deleted(&self, provider_uri: &str, device: DeviceId) {
        let known = self.registry.lock().delete(provider_uri, device);
        match known {
            Some(known) => {
                tracing::info!(device = %known.id, provider = provider_uri, "device deleted");
                self.device_gone(known, DeviceEventKind::Deleted);
            }
            None => tracing::debug!(provider = provider_uri, %device, "delete for unknown device"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: u64, motors: usize) -> DeviceInfo {
        DeviceInfo {
            id: DeviceId(id),
            display_name: format!("toy {id}"),
            motors: vec![crate::device::MotorInfo { steps: 10 }; motors],
        }
    }

    #[test]
    fn registry_ids_are_stable_per_provider_device() {
        let mut registry = Registry::default();
        let a = registry.online("a://", &info(1, 1));
        let b = registry.online("b://", &info(1, 1));
        assert_ne!(a, b);

        registry.offline("a://", DeviceId(1));
        assert_eq!(registry.online("a://", &info(1, 2)), a);
        assert_eq!(registry.devices[&a].motors, 2);
    }

    #[test]
    fn registry_delete_forgets_device() {
        let mut registry = Registry::default();
        let id = registry.online("a://", &info(7, 1));
        let deleted = registry.delete("a://", DeviceId(7)).unwrap();
        assert_eq!(deleted.id, id);
        assert!(!deleted.online);
        assert!(registry.devices.is_empty());
        assert!(registry.delete("a://", DeviceId(7)).is_none());
        assert_ne!(registry.online("a://", &info(7, 1)), id);
    }

    #[test]
    fn offline_keeps_device_known() {
        let mut registry = Registry::default();
        let id = registry.online("a://", &info(3, 1));
        let known = registry.offline("a://", DeviceId(3)).unwrap();
        assert_eq!(known.id, id);
        assert!(!registry.devices[&id].online);
        assert!(registry.offline("a://", DeviceId(4)).is_none());
    }
}
