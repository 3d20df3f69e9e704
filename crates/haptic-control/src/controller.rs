//! Device controller.
//!
//! [`ControlCore`] owns the control graph and everything wired into it:
//!
//! ```text
//! gravity ───────────────┐
//! linear_accel ─► shake ─┤  (selected per motor)
//! manual[i] ─────────────┴─► output[i] ─► quantizer[i] ─► limiter[i] ─► sink[i]
//! ```
//!
//! The shared sources exist once. Everything from `manual` rightwards is
//! built per device. [`ToyController`] moves the core onto a [`Worker`]
//! and exposes the same operations as queued jobs.

use std::collections::BTreeMap;
use std::sync::Arc;

use haptic_config::ControlConfig;
use haptic_core::{
    Clock, ControlGraph, Node, NodeId, NormalisedGravity, Passthrough, Quantizer, RateLimiter,
    ShakeIntensity, Sink, Slot,
};

use crate::device::{DeviceId, DeviceInfo, MotorInfo};
use crate::error::ControlError;
use crate::mode::SimpleControlMode;
use crate::sensor::{SensorBackend, SensorHub, SensorKind};
use crate::worker::{Tickable, Worker};

/// Graph nodes belonging to one device.
#[derive(Debug, Clone)]
struct DeviceNodes {
    manual: NodeId,
    output: NodeId,
    sink: NodeId,
    limiter: NodeId,
    quantizers: Vec<NodeId>,
}

impl DeviceNodes {
    fn motors(&self) -> usize {
        self.quantizers.len()
    }

    /// Nodes rebuilt when a device re-registers with the same shape.
    fn chain(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.quantizers
            .iter()
            .copied()
            .chain([self.limiter, self.sink])
    }
}

/// Graph owner and device bookkeeping. Lives on the worker thread.
pub struct ControlCore {
    graph: ControlGraph,
    clock: Arc<dyn Clock>,
    config: ControlConfig,
    gravity: NodeId,
    linear_accel: NodeId,
    shake: NodeId,
    devices: BTreeMap<DeviceId, DeviceNodes>,
    sensors: SensorHub,
}

impl ControlCore {
    /// Builds the shared sources.
    ///
    /// The configuration is validated before anything is constructed.
    pub fn new(
        config: ControlConfig,
        clock: Arc<dyn Clock>,
        sensors: Box<dyn SensorBackend>,
    ) -> Result<Self, ControlError> {
        config.validate()?;
        let mut graph = ControlGraph::new();
        let gravity = graph.add_node(NormalisedGravity::with_cutoff(
            config.gravity.length_cutoff,
        ));
        let linear_accel = graph.add_node(Passthrough::new(3));
        let shake = graph.add_node(ShakeIntensity::with_settings(
            config.shake.period_ms,
            config.shake.full_scale,
            Arc::clone(&clock),
        )?);
        for axis in 0..3 {
            graph.link(linear_accel, axis, shake, axis)?;
        }
        graph.refresh_topology()?;

        Ok(Self {
            graph,
            clock,
            config,
            gravity,
            linear_accel,
            shake,
            devices: BTreeMap::new(),
            sensors: SensorHub::new(sensors),
        })
    }

    /// Wires a device into the graph.
    ///
    /// `callback` receives the rate-limited, quantized motor values. Every
    /// motor starts bound to manual input. A device already present with
    /// the same motor count keeps its manual values; with a different
    /// count it is rebuilt from scratch.
    pub fn add_device(
        &mut self,
        info: &DeviceInfo,
        callback: impl FnMut(&[f32]) + Send + 'static,
    ) -> Result<(), ControlError> {
        let id = info.id;
        let motors = info.motor_count();

        let quantizers = info
            .motors
            .iter()
            .map(|motor| {
                Quantizer::new(
                    self.step_count(motor),
                    self.config.controller.default_dead_zone,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let limiter = RateLimiter::new(
            self.config.controller.device_rate_limit_ms,
            motors,
            Arc::clone(&self.clock),
        )?;

        if self.devices.get(&id).is_some_and(|nodes| nodes.motors() != motors) {
            tracing::debug!(device = %id, motors, "motor count changed, rebuilding device");
            self.remove_device(id)?;
        }

        let (manual, output) = match self.devices.remove(&id) {
            Some(previous) => {
                for node in previous.chain() {
                    self.graph.remove_node(node)?;
                }
                (previous.manual, previous.output)
            }
            None => (
                self.graph.add_node(Passthrough::new(motors)),
                self.graph.add_node(Passthrough::new(motors)),
            ),
        };

        let limiter = self.graph.add_node(limiter);
        let sink = self.graph.add_node(Sink::new(motors, callback));
        let mut quantizer_ids = Vec::with_capacity(motors);
        for (motor, quantizer) in quantizers.into_iter().enumerate() {
            let quantizer = self.graph.add_node(quantizer);
            self.graph.link(output, motor, quantizer, 0)?;
            self.graph.link(quantizer, 0, limiter, motor)?;
            self.graph.link(limiter, motor, sink, motor)?;
            quantizer_ids.push(quantizer);
        }
        for motor in 0..motors {
            self.graph.link(manual, motor, output, motor)?;
        }
        // Fresh quantizers need the current output values.
        self.graph.invalidate(output)?;

        self.devices.insert(
            id,
            DeviceNodes {
                manual,
                output,
                sink,
                limiter,
                quantizers: quantizer_ids,
            },
        );
        tracing::info!(device = %id, name = %info.display_name, motors, "device added");
        tracing::trace!("graph after add:\n{}", self.graph.dump());
        self.update_subscriptions()
    }

    /// Removes every node of a device. Returns whether it was present.
    pub fn remove_device(&mut self, id: DeviceId) -> Result<bool, ControlError> {
        let Some(nodes) = self.devices.remove(&id) else {
            return Ok(false);
        };
        for node in nodes.chain().chain([nodes.output, nodes.manual]) {
            self.graph.remove_node(node)?;
        }
        tracing::info!(device = %id, "device removed");
        self.update_subscriptions()?;
        Ok(true)
    }

    /// Binds the motor's output slot to the source for `mode`, or unbinds
    /// it for `None`.
    pub fn set_simple_control_mode(
        &mut self,
        id: DeviceId,
        motor: usize,
        mode: Option<SimpleControlMode>,
    ) -> Result<(), ControlError> {
        let nodes = self.device(id, motor)?;
        let output = nodes.output;
        match mode {
            Some(mode) => {
                let source = self.mode_source(nodes.manual, motor, mode);
                self.graph.invalidate(source.node)?;
                self.graph.link(source.node, source.index, output, motor)?;
            }
            None => {
                self.graph.unlink_input(output, motor);
            }
        }
        tracing::debug!(device = %id, motor, mode = ?mode, "control mode set");
        self.update_subscriptions()
    }

    /// Mode currently bound to a motor, if any.
    pub fn simple_control_mode(&self, id: DeviceId, motor: usize) -> Option<SimpleControlMode> {
        let nodes = self.device(id, motor).ok()?;
        let bound = self.graph.source_of(nodes.output, motor)?;
        SimpleControlMode::ALL
            .into_iter()
            .find(|&mode| self.mode_source(nodes.manual, motor, mode) == bound)
    }

    /// Sets the manual intensity of a motor.
    pub fn set_manual_input(
        &mut self,
        id: DeviceId,
        motor: usize,
        value: f32,
    ) -> Result<(), ControlError> {
        let manual = self.device(id, motor)?.manual;
        self.graph.set_input(manual, motor, value)?;
        Ok(())
    }

    /// Feeds a sensor sample into its source node.
    pub fn on_sensor(&mut self, kind: SensorKind, values: [f32; 3]) -> Result<(), ControlError> {
        let node = match kind {
            SensorKind::Gravity => self.gravity,
            SensorKind::LinearAcceleration => self.linear_accel,
        };
        self.graph.push_inputs(node, &values)?;
        Ok(())
    }

    /// Last values handed to each device's sink.
    pub fn current_outputs(&self) -> BTreeMap<DeviceId, Vec<f32>> {
        self.devices
            .iter()
            .filter_map(|(&id, nodes)| {
                let sink = self.graph.node(nodes.sink)?;
                Some((id, sink.inputs().to_vec()))
            })
            .collect()
    }

    /// Registered devices, in id order.
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.keys().copied().collect()
    }

    /// Number of registered devices.
    pub fn active_devices(&self) -> usize {
        self.devices.len()
    }

    /// Motor count of a registered device.
    pub fn motor_count(&self, id: DeviceId) -> Option<usize> {
        self.devices.get(&id).map(DeviceNodes::motors)
    }

    /// Starts sensor delivery for whatever the graph needs.
    pub fn start_sensors(&mut self) {
        self.sensors.start();
    }

    /// Stops all sensor delivery.
    pub fn stop_sensors(&mut self) {
        self.sensors.stop();
    }

    /// Whether the backend is currently delivering `kind`.
    pub fn sensor_registered(&self, kind: SensorKind) -> bool {
        self.sensors.is_registered(kind)
    }

    /// Whether any device currently depends on `kind`.
    pub fn sensor_wanted(&self, kind: SensorKind) -> bool {
        self.sensors.is_wanted(kind)
    }

    /// The graph, for inspection.
    pub fn graph(&self) -> &ControlGraph {
        &self.graph
    }

    fn device(&self, id: DeviceId, motor: usize) -> Result<&DeviceNodes, ControlError> {
        let nodes = self
            .devices
            .get(&id)
            .ok_or(ControlError::UnknownDevice(id))?;
        if motor >= nodes.motors() {
            return Err(ControlError::MotorOutOfRange { device: id, motor });
        }
        Ok(nodes)
    }

    fn mode_source(&self, manual: NodeId, motor: usize, mode: SimpleControlMode) -> Slot {
        match mode {
            SimpleControlMode::Manual => Slot::new(manual, motor),
            SimpleControlMode::GravityX => Slot::new(self.gravity, 0),
            SimpleControlMode::GravityY => Slot::new(self.gravity, 1),
            SimpleControlMode::GravityZ => Slot::new(self.gravity, 2),
            SimpleControlMode::Shake => Slot::new(self.shake, 0),
        }
    }

    fn step_count(&self, motor: &MotorInfo) -> u32 {
        if motor.steps > 1 {
            motor.steps
        } else {
            self.config.controller.fallback_step_count
        }
    }

    fn update_subscriptions(&mut self) -> Result<(), ControlError> {
        self.graph.refresh_topology()?;
        let gravity = self.graph.is_node_used(self.gravity);
        let linear_accel = self.graph.is_node_used(self.linear_accel);
        self.sensors.set_wanted(SensorKind::Gravity, gravity);
        self.sensors
            .set_wanted(SensorKind::LinearAcceleration, linear_accel);
        Ok(())
    }
}

impl Tickable for ControlCore {
    fn tick(&mut self) -> Option<u64> {
        match self.graph.update() {
            Ok(delay) => delay,
            Err(err) => {
                tracing::error!(%err, "graph update failed");
                None
            }
        }
    }

    fn shutdown(&mut self) {
        self.stop_sensors();
    }
}

/// Thread-safe handle to a [`ControlCore`] running on its own thread.
///
/// Cloning is cheap; every clone talks to the same worker. Mutations are
/// queued and return once enqueued; their failures are logged on the
/// worker. Queries block until the worker answers.
#[derive(Clone)]
pub struct ToyController {
    worker: Arc<Worker<ControlCore>>,
}

impl ToyController {
    /// Spawns the worker thread and starts sensor delivery.
    pub fn start(core: ControlCore) -> Result<Self, ControlError> {
        let worker = Worker::spawn("haptic-control", core)?;
        worker.post(ControlCore::start_sensors)?;
        Ok(Self {
            worker: Arc::new(worker),
        })
    }

    /// Queues [`ControlCore::add_device`].
    pub fn add_device(
        &self,
        info: DeviceInfo,
        callback: impl FnMut(&[f32]) + Send + 'static,
    ) -> Result<(), ControlError> {
        self.post_logged("add_device", move |core| core.add_device(&info, callback))
    }

    /// Queues [`ControlCore::remove_device`].
    pub fn remove_device(&self, id: DeviceId) -> Result<(), ControlError> {
        self.post_logged("remove_device", move |core| core.remove_device(id).map(drop))
    }

    /// Queues [`ControlCore::set_simple_control_mode`].
    pub fn set_simple_control_mode(
        &self,
        id: DeviceId,
        motor: usize,
        mode: Option<SimpleControlMode>,
    ) -> Result<(), ControlError> {
        self.post_logged("set_simple_control_mode", move |core| {
            core.set_simple_control_mode(id, motor, mode)
        })
    }

    /// Queues [`ControlCore::set_manual_input`].
    pub fn set_manual_input(&self, id: DeviceId, motor: usize, value: f32) -> Result<(), ControlError> {
        self.post_logged("set_manual_input", move |core| {
            core.set_manual_input(id, motor, value)
        })
    }

    /// Queues a sensor sample.
    pub fn on_sensor_event(&self, kind: SensorKind, values: [f32; 3]) -> Result<(), ControlError> {
        self.post_logged("on_sensor_event", move |core| core.on_sensor(kind, values))
    }

    /// Mode bound to a motor, read on the worker.
    pub fn simple_control_mode(
        &self,
        id: DeviceId,
        motor: usize,
    ) -> Result<Option<SimpleControlMode>, ControlError> {
        Ok(self
            .worker
            .query(move |core| core.simple_control_mode(id, motor))?)
    }

    /// Snapshot of [`ControlCore::current_outputs`].
    pub fn current_outputs(&self) -> Result<BTreeMap<DeviceId, Vec<f32>>, ControlError> {
        Ok(self.worker.query(|core| core.current_outputs())?)
    }

    /// Number of registered devices.
    pub fn active_devices(&self) -> Result<usize, ControlError> {
        Ok(self.worker.query(|core| core.active_devices())?)
    }

    /// Whether the backend is delivering `kind`.
    pub fn sensor_registered(&self, kind: SensorKind) -> Result<bool, ControlError> {
        Ok(self.worker.query(move |core| core.sensor_registered(kind))?)
    }

    /// Runs an arbitrary job on the worker.
    pub fn post(&self, job: impl FnOnce(&mut ControlCore) + Send + 'static) -> Result<(), ControlError> {
        Ok(self.worker.post(job)?)
    }

    /// Runs an arbitrary job on the worker and waits for its result.
    pub fn query<R: Send + 'static>(
        &self,
        job: impl FnOnce(&mut ControlCore) -> R + Send + 'static,
    ) -> Result<R, ControlError> {
        Ok(self.worker.query(job)?)
    }

    /// Stops the worker thread without running queued jobs, then stops
    /// sensor delivery.
    pub fn stop(&self) {
        self.worker.stop();
    }

    fn post_logged(
        &self,
        operation: &'static str,
        job: impl FnOnce(&mut ControlCore) -> Result<(), ControlError> + Send + 'static,
    ) -> Result<(), ControlError> {
        self.worker.post(move |core| {
            if let Err(err) = job(core) {
                tracing::warn!(operation, %err, "control job failed");
            }
        })?;
        Ok(())
    }
}
