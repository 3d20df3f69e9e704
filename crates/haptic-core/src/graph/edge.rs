//! Port-level edges.
//!
//! An edge joins one output register of a source node to one input register
//! of a destination node. Two views are kept side by side: the input map
//! answers "what feeds this slot" and enforces one edge per input slot, the
//! output map answers "who listens to this node" for pruning and Kahn's
//! algorithm. Every mutation goes through [`EdgeMap`] so the views cannot
//! drift apart.

use std::collections::BTreeMap;
use std::fmt;

use super::node::NodeId;

/// A register on a specific node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    /// Owning node.
    pub node: NodeId,
    /// Register index on that node.
    pub index: usize,
}

impl Slot {
    /// Creates a slot reference.
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.node, self.index)
    }
}

/// Outgoing half of an edge, stored under its source node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HalfEdge {
    pub output: usize,
    pub dest: Slot,
}

/// Both adjacency views of the edge relation.
#[derive(Clone, Debug, Default)]
pub(crate) struct EdgeMap {
    inputs: BTreeMap<Slot, Slot>,
    outputs: BTreeMap<NodeId, Vec<HalfEdge>>,
}

impl EdgeMap {
    /// Binds `source` to `dest`, returning the source it displaced.
    pub fn insert(&mut self, source: Slot, dest: Slot) -> Option<Slot> {
        let replaced = self.remove_input(dest);
        self.inputs.insert(dest, source);
        self.outputs.entry(source.node).or_default().push(HalfEdge {
            output: source.index,
            dest,
        });
        replaced
    }

    /// Unbinds an input slot.
    pub fn remove_input(&mut self, dest: Slot) -> Option<Slot> {
        let source = self.inputs.remove(&dest)?;
        if let Some(halves) = self.outputs.get_mut(&source.node) {
            halves.retain(|h| h.dest != dest);
            if halves.is_empty() {
                self.outputs.remove(&source.node);
            }
        }
        Some(source)
    }

    /// Drops every edge touching `node`.
    pub fn remove_node(&mut self, node: NodeId) {
        for half in self.outputs.remove(&node).unwrap_or_default() {
            self.inputs.remove(&half.dest);
        }
        let bound: Vec<Slot> = self.inputs_of(node).map(|(dest, _)| dest).collect();
        for dest in bound {
            self.remove_input(dest);
        }
    }

    /// Removes and returns the outgoing edges of `node`.
    pub fn take_outgoing(&mut self, node: NodeId) -> Vec<HalfEdge> {
        let halves = self.outputs.remove(&node).unwrap_or_default();
        for half in &halves {
            self.inputs.remove(&half.dest);
        }
        halves
    }

    pub fn source_of(&self, dest: Slot) -> Option<Slot> {
        self.inputs.get(&dest).copied()
    }

    /// Bound input slots of `node` with their sources, in slot order.
    pub fn inputs_of(&self, node: NodeId) -> impl Iterator<Item = (Slot, Slot)> + '_ {
        self.inputs
            .range(Slot::new(node, 0)..=Slot::new(node, usize::MAX))
            .map(|(dest, source)| (*dest, *source))
    }

    pub fn has_outgoing(&self, node: NodeId) -> bool {
        self.outputs.contains_key(&node)
    }

    /// Every edge as `(source, dest)`, ordered by destination.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, Slot)> + '_ {
        self.inputs.iter().map(|(dest, source)| (*source, *dest))
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Verifies that both views describe the same edge set.
    pub fn check_consistency(&self) -> Result<(), String> {
        let mut half_count = 0;
        for (&node, halves) in &self.outputs {
            if halves.is_empty() {
                return Err(format!("empty out-list kept for {node}"));
            }
            for half in halves {
                half_count += 1;
                let expected = Slot::new(node, half.output);
                match self.inputs.get(&half.dest) {
                    Some(&source) if source == expected => {}
                    Some(&source) => {
                        return Err(format!(
                            "{} is fed by {source} but {expected} claims it",
                            half.dest
                        ));
                    }
                    None => {
                        return Err(format!(
                            "{expected} -> {} has no matching input entry",
                            half.dest
                        ));
                    }
                }
            }
        }
        for (&dest, &source) in &self.inputs {
            let listed = self.outputs.get(&source.node).is_some_and(|halves| {
                halves
                    .iter()
                    .any(|h| h.dest == dest && h.output == source.index)
            });
            if !listed {
                return Err(format!("{source} -> {dest} has no matching output entry"));
            }
        }
        if half_count != self.inputs.len() {
            return Err(format!(
                "{half_count} outgoing entries for {} incoming",
                self.inputs.len()
            ));
        }
        Ok(())
    }
}
