//! Dataflow graph for haptic control.
//!
//! The graph is an arena of [`NodeKind`](crate::NodeKind) values addressed by
//! [`NodeId`] handles, wired at register granularity: each edge joins one
//! output register to one input register, and an input register accepts at
//! most one edge.
//!
//! # Architecture
//!
//! - [`ControlGraph`] owns nodes and edges and performs every mutation.
//!   `link` recomputes the topology eagerly so cycles are rejected at the
//!   call site; `unlink_input` and `remove_node` only mark it stale.
//! - Topology rebuilds prune nodes that cannot influence any side effect,
//!   then order the survivors with Kahn's algorithm.
//! - [`ControlGraph::update`] walks the order once per tick, copying
//!   outputs of nodes that changed on the previous tick into their
//!   listeners and updating nodes that received input or were invalidated.
//!
//! # Example
//!
//! ```rust
//! use haptic_core::graph::{ControlGraph, GraphError};
//! use haptic_core::{NormalisedGravity, Passthrough, Sink};
//!
//! let mut graph = ControlGraph::new();
//! let gravity = graph.add_node(NormalisedGravity::new());
//! let select = graph.add_node(Passthrough::new(1));
//! let sink = graph.add_node(Sink::new(1, |_: &[f32]| {}));
//!
//! graph.link(gravity, 2, select, 0)?;
//! graph.link(select, 0, sink, 0)?;
//! assert_eq!(graph.link(select, 0, gravity, 0), Err(GraphError::CycleDetected));
//! assert!(graph.is_node_used(gravity));
//! # Ok::<(), GraphError>(())
//! ```

mod control;
pub mod edge;
pub mod node;
mod topology;

pub use control::{ControlGraph, GraphError};
pub use edge::Slot;
pub use node::NodeId;
