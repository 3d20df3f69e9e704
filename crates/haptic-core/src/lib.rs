//! Haptic Core - dataflow primitives for driving haptic actuators
//!
//! This crate provides the signal-processing core that turns live sensor and
//! user-input values into actuator intensities. Everything here runs on a
//! single owning thread; the scheduling actor lives in `haptic-control`.
//!
//! # Core Abstractions
//!
//! ## Node Contract
//!
//! - [`Node`] - Register-based processing unit with a sticky `invalidated` flag
//! - [`Delay`] - What an update asks of the scheduler (propagate, idle, revisit later)
//! - [`Registers`] - Fixed-size input/output register arrays shared by every node
//!
//! ## Node Catalogue
//!
//! - [`Passthrough`] - Copies inputs to outputs
//! - [`Envelope`] - Asymmetric attack/decay smoothing
//! - [`Magnitude`] - Euclidean length of the input vector
//! - [`NormalisedGravity`] - Unit gravity direction clamped to [0, 1]
//! - [`Quantizer`] - Step quantization with hysteresis
//! - [`RateLimiter`] - Gated, time-limited emission
//! - [`ShakeIntensity`] - Composite shake detector
//! - [`Sink`] - Side-effecting terminal that hands values to a callback
//!
//! ## Graph
//!
//! - [`ControlGraph`] - Arena of nodes, port-level edges, pruning, topological tick
//!
//! ## Time
//!
//! - [`Clock`] - Injectable millisecond clock ([`MonotonicClock`], [`ManualClock`])
//!
//! # Example
//!
//! ```rust
//! use haptic_core::{ControlGraph, Node, Passthrough, Sink};
//!
//! let mut graph = ControlGraph::new();
//! let source = graph.add_node(Passthrough::new(1));
//! let sink = graph.add_node(Sink::new(1, |values: &[f32]| println!("{values:?}")));
//! graph.link(source, 0, sink, 0).unwrap();
//!
//! graph.push_inputs(source, &[0.5]).unwrap();
//! while let Some(0) = graph.update().unwrap() {}
//! assert_eq!(graph.node(sink).map(|n| n.inputs()), Some(&[0.5][..]));
//! ```
//!
//! # Feature Flags
//!
//! - `tracing`: emit `tracing` events for graph mutations and topology rebuilds.

pub mod clock;
pub mod graph;
pub mod math;
pub mod node;
pub mod nodes;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use graph::{ControlGraph, GraphError, NodeId, Slot};
pub use math::{clamp01, length, normalise};
pub use node::{Delay, IMMEDIATE, NO_CHANGE, Node, Registers};
pub use nodes::{
    Envelope, Gate, Magnitude, NodeConfigError, NodeKind, NormalisedGravity, Passthrough,
    Quantizer, RateLimiter, ShakeIntensity, Sink,
};
