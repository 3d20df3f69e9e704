//! Control graph - mutation API, topology maintenance, and ticking.
//!
//! [`ControlGraph`] owns every node and edge. It is single-threaded by
//! construction: the scheduling actor in `haptic-control` is the only owner
//! and serialises all access through its job queue.

use thiserror::Error;

use crate::node::{Delay, Node};
use crate::nodes::NodeKind;

use super::edge::{EdgeMap, Slot};
use super::node::{Entry, NodeId};
use super::topology;

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// The specified node was not found in the graph.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// Output register index past the end of the node's outputs.
    #[error("output {index} out of range for {node} ({count} outputs)")]
    OutputOutOfRange {
        /// Offending node.
        node: NodeId,
        /// Requested index.
        index: usize,
        /// Number of outputs the node has.
        count: usize,
    },

    /// Input register index past the end of the node's inputs.
    #[error("input {index} out of range for {node} ({count} inputs)")]
    InputOutOfRange {
        /// Offending node.
        node: NodeId,
        /// Requested index.
        index: usize,
        /// Number of inputs the node has.
        count: usize,
    },

    /// Adding this edge would create a cycle.
    #[error("linking would create a cycle")]
    CycleDetected,

    /// The two adjacency views disagree.
    #[error("edge maps are inconsistent: {0}")]
    InconsistentEdges(String),

    /// A state the algorithms should never reach.
    #[error("internal graph error: {0}")]
    Internal(String),
}

/// Directed acyclic graph of control nodes.
///
/// # Usage
///
/// 1. Create a graph with [`new()`](Self::new)
/// 2. Add nodes with [`add_node()`](Self::add_node)
/// 3. Wire registers with [`link()`](Self::link)
/// 4. Feed sources with [`push_inputs()`](Self::push_inputs)
/// 5. Call [`update()`](Self::update) whenever the returned delay expires
///
/// # Propagation
///
/// A node whose update reports [`Delay::Immediate`] becomes dirty, and its
/// outputs are copied into downstream inputs on the *next* tick. A change
/// therefore travels exactly one edge per tick, and `update` returns
/// `Some(0)` while dirty marks are still pending.
#[derive(Debug, Default)]
pub struct ControlGraph {
    nodes: Vec<Entry>,
    /// Vacant slots, reused by `add_node`.
    free: Vec<u32>,
    edges: EdgeMap,
    sorted: Vec<NodeId>,
    topology_stale: bool,
    /// Dirty marks produced by the previous tick, read by this one.
    dirty: Vec<bool>,
    /// Dirty marks produced by this tick.
    dirty_next: Vec<bool>,
    scratch: Vec<(usize, f32)>,
}

impl ControlGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Node mutations ---

    /// Adds a node and returns its handle.
    pub fn add_node(&mut self, node: impl Into<NodeKind>) -> NodeId {
        let kind = node.into();
        let id = match self.free.pop() {
            Some(slot) => {
                let entry = &mut self.nodes[slot as usize];
                entry.node = Some(kind);
                NodeId::new(slot as usize, entry.generation)
            }
            None => {
                self.nodes.push(Entry {
                    generation: 0,
                    node: Some(kind),
                });
                self.dirty.push(false);
                self.dirty_next.push(false);
                NodeId::new(self.nodes.len() - 1, 0)
            }
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "graph_add: {} node {id}",
            self.node(id).map_or("?", NodeKind::name)
        );
        self.topology_stale = true;
        id
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.get(id)?;
        self.edges.remove_node(id);
        let entry = &mut self.nodes[id.slot()];
        entry.node = None;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.index());
        self.dirty[id.slot()] = false;
        self.dirty_next[id.slot()] = false;
        self.topology_stale = true;
        debug_assert!(self.check_consistency().is_ok());
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_remove: node {id}");
        Ok(())
    }

    /// Returns a node, if it exists.
    pub fn node(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.slot())?.get(id)
    }

    /// Returns a node mutably, if it exists.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeKind> {
        self.nodes.get_mut(id.slot())?.get_mut(id)
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Copies `values` into the leading input registers of `id` and
    /// invalidates it. Extra values are ignored.
    pub fn push_inputs(&mut self, id: NodeId, values: &[f32]) -> Result<(), GraphError> {
        let node = self.get_mut(id)?;
        for (register, &value) in node.inputs_mut().iter_mut().zip(values) {
            *register = value;
        }
        node.set_invalidated(true);
        Ok(())
    }

    /// Writes one input register and invalidates the node.
    pub fn set_input(&mut self, id: NodeId, index: usize, value: f32) -> Result<(), GraphError> {
        let node = self.get_mut(id)?;
        let count = node.inputs().len();
        let register = node
            .inputs_mut()
            .get_mut(index)
            .ok_or(GraphError::InputOutOfRange {
                node: id,
                index,
                count,
            })?;
        *register = value;
        node.set_invalidated(true);
        Ok(())
    }

    /// Forces `id` to update on the next tick.
    pub fn invalidate(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.get_mut(id)?.set_invalidated(true);
        Ok(())
    }

    // --- Edge mutations ---

    /// Connects output `output` of `src` to input `input` of `dst`.
    ///
    /// An existing edge into that input is replaced. The topology is
    /// recomputed immediately; if the new edge closes a cycle the graph is
    /// restored exactly (including any replaced edge) and
    /// [`GraphError::CycleDetected`] is returned.
    pub fn link(
        &mut self,
        src: NodeId,
        output: usize,
        dst: NodeId,
        input: usize,
    ) -> Result<(), GraphError> {
        let out_count = self.get(src)?.outputs().len();
        if output >= out_count {
            return Err(GraphError::OutputOutOfRange {
                node: src,
                index: output,
                count: out_count,
            });
        }
        let in_count = self.get(dst)?.inputs().len();
        if input >= in_count {
            return Err(GraphError::InputOutOfRange {
                node: dst,
                index: input,
                count: in_count,
            });
        }

        let source = Slot::new(src, output);
        let dest = Slot::new(dst, input);
        let saved_order = self.sorted.clone();
        let saved_stale = self.topology_stale;

        let replaced = self.edges.insert(source, dest);
        self.topology_stale = true;
        if let Err(err) = self.refresh_topology() {
            self.edges.remove_input(dest);
            if let Some(previous) = replaced {
                self.edges.insert(previous, dest);
            }
            self.sorted = saved_order;
            self.topology_stale = saved_stale;
            debug_assert!(self.check_consistency().is_ok());
            #[cfg(feature = "tracing")]
            tracing::debug!("graph_link: {source} -> {dest} rejected: {err}");
            return Err(err);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_link: {source} -> {dest}");
        Ok(())
    }

    /// Removes the edge feeding input `input` of `dst`, returning its source.
    ///
    /// The topology is only marked stale; it is rebuilt lazily.
    pub fn unlink_input(&mut self, dst: NodeId, input: usize) -> Option<Slot> {
        let removed = self.edges.remove_input(Slot::new(dst, input))?;
        self.topology_stale = true;
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_unlink: {removed} -> {}", Slot::new(dst, input));
        Some(removed)
    }

    /// Whether exactly this edge exists.
    pub fn has_link(&self, src: NodeId, output: usize, dst: NodeId, input: usize) -> bool {
        self.edges.source_of(Slot::new(dst, input)) == Some(Slot::new(src, output))
    }

    /// The output slot feeding input `input` of `dst`.
    pub fn source_of(&self, dst: NodeId, input: usize) -> Option<Slot> {
        self.edges.source_of(Slot::new(dst, input))
    }

    /// Every edge as `(source, dest)`.
    pub fn edges(&self) -> impl Iterator<Item = (Slot, Slot)> + '_ {
        self.edges.iter()
    }

    // --- Topology ---

    /// Rebuilds the evaluation order if any mutation made it stale.
    pub fn refresh_topology(&mut self) -> Result<(), GraphError> {
        if !self.topology_stale {
            return Ok(());
        }
        debug_assert!(self.check_consistency().is_ok());
        self.sorted = topology::sort(&self.nodes, &self.edges)?;
        self.topology_stale = false;
        debug_assert!(self.check_consistency().is_ok());
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_sort: {} nodes in topo order", self.sorted.len());
        Ok(())
    }

    /// Whether `id` is part of the last computed evaluation order.
    ///
    /// Pruned nodes are unused. Call [`refresh_topology`](Self::refresh_topology)
    /// first to observe edits made since the last rebuild.
    pub fn is_node_used(&self, id: NodeId) -> bool {
        self.sorted.contains(&id)
    }

    /// Last computed evaluation order.
    pub fn sorted_nodes(&self) -> &[NodeId] {
        &self.sorted
    }

    /// Whether a mutation has happened since the last rebuild.
    pub fn is_topology_stale(&self) -> bool {
        self.topology_stale
    }

    /// Verifies the two adjacency views agree and only reference live nodes.
    pub fn check_consistency(&self) -> Result<(), GraphError> {
        self.edges
            .check_consistency()
            .map_err(GraphError::InconsistentEdges)?;
        for (source, dest) in self.edges.iter() {
            for slot in [source, dest] {
                if !self.contains(slot.node) {
                    return Err(GraphError::InconsistentEdges(format!(
                        "edge {source} -> {dest} references removed {}",
                        slot.node
                    )));
                }
            }
        }
        Ok(())
    }

    // --- Execution ---

    /// Runs one tick.
    ///
    /// Returns the number of milliseconds until the graph wants another
    /// tick, `Some(0)` when changes are still propagating, or `None` when
    /// nothing is pending and only new input can produce work.
    pub fn update(&mut self) -> Result<Option<u64>, GraphError> {
        self.refresh_topology()?;
        std::mem::swap(&mut self.dirty, &mut self.dirty_next);
        self.dirty_next.iter_mut().for_each(|d| *d = false);

        let mut wake: Option<u64> = None;
        let mut propagating = false;
        let mut scratch = std::mem::take(&mut self.scratch);

        for position in 0..self.sorted.len() {
            let id = self.sorted[position];

            scratch.clear();
            for (dest, source) in self.edges.inputs_of(id) {
                if !self.dirty[source.node.slot()] {
                    continue;
                }
                let value = self
                    .node(source.node)
                    .and_then(|n| n.outputs().get(source.index).copied())
                    .ok_or_else(|| {
                        GraphError::Internal(format!("dangling source {source} for {dest}"))
                    })?;
                scratch.push((dest.index, value));
            }

            let node = self.get_mut(id)?;
            for &(index, value) in &scratch {
                node.inputs_mut()[index] = value;
            }
            if scratch.is_empty() && !node.is_invalidated() {
                continue;
            }

            match node.update() {
                Delay::Immediate => {
                    self.dirty_next[id.slot()] = true;
                    propagating = true;
                }
                Delay::After(ms) => wake = Some(wake.map_or(ms, |w| w.min(ms))),
                Delay::NoChange => {}
            }
        }

        self.scratch = scratch;
        #[cfg(feature = "tracing")]
        tracing::trace!("graph_tick: propagating={propagating} wake={wake:?}");
        Ok(if propagating { Some(0) } else { wake })
    }

    // --- Introspection ---

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Human-readable edge listing, one edge per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (source, dest) in self.edges.iter() {
            let name = |slot: Slot| self.node(slot.node).map_or("?", NodeKind::name);
            out.push_str(&format!(
                "{} {source} -> {} {dest}\n",
                name(source),
                name(dest)
            ));
        }
        out
    }

    fn get(&self, id: NodeId) -> Result<&NodeKind, GraphError> {
        self.node(id).ok_or(GraphError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeKind, GraphError> {
        self.node_mut(id).ok_or(GraphError::NodeNotFound(id))
    }
}
