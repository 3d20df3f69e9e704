//! Haptic Control - the runtime around the control graph
//!
//! `haptic-core` computes; this crate schedules, wires devices and talks to
//! the outside world.
//!
//! # Components
//!
//! - [`Worker`] - Dedicated thread owning mutable state, driven by queued jobs and timed ticks
//! - [`ControlCore`] / [`ToyController`] - Device subgraphs, control modes, sensor demand
//! - [`SensorHub`] - Registers sensors with a [`SensorBackend`] only while needed
//! - [`DeviceProvider`] - Transport abstraction; [`DebugDeviceProvider`] is an in-process stub
//! - [`ControlService`] - Provider listener that wires devices and fans out [`ControlEvent`]s
//!
//! # Threading
//!
//! Only the worker thread touches graph nodes. Every other thread goes
//! through [`ToyController`], whose methods enqueue closures. Sink
//! callbacks run on the worker thread.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use haptic_config::ControlConfig;
//! use haptic_control::{
//!     ControlCore, ControlService, DebugProviderFactory, NullSensorBackend, ToyController,
//! };
//! use haptic_core::MonotonicClock;
//!
//! let core = ControlCore::new(
//!     ControlConfig::default(),
//!     Arc::new(MonotonicClock::new()),
//!     Box::new(NullSensorBackend),
//! )
//! .unwrap();
//! let service = ControlService::new(ToyController::start(core).unwrap());
//!
//! let provider = service.add_provider(&DebugProviderFactory::default()).unwrap();
//! provider.connect().unwrap();
//! assert_eq!(service.online_devices().len(), 1);
//! service.shutdown();
//! ```

mod controller;
mod debug_provider;
mod device;
mod error;
mod events;
mod mode;
mod sensor;
mod service;
mod worker;

pub use controller::{ControlCore, ToyController};
pub use debug_provider::{DEBUG_PROVIDER_URI, DebugDeviceProvider, DebugProviderFactory};
pub use device::{
    DeviceId, DeviceInfo, DeviceProvider, DeviceProviderListener, MotorInfo, ProviderError,
    ProviderFactory,
};
pub use error::{ControlError, WorkerError};
pub use events::{
    ControlEvent, DeliveryError, DeviceEvent, DeviceEventKind, DeviceOutputEvent,
    EventBroadcaster, EventListener,
};
pub use mode::{ParseModeError, SimpleControlMode};
pub use sensor::{NullSensorBackend, SensorBackend, SensorError, SensorHub, SensorKind};
pub use service::{ControlService, KnownDevice};
pub use worker::{Tickable, Worker};
