//! Node handles for the control graph arena.

use std::fmt;

use crate::nodes::NodeKind;

/// Unique identifier for a node in the control graph.
///
/// A handle is an arena slot plus the generation of that slot. Slots freed
/// by [`remove_node`](super::ControlGraph::remove_node) are recycled with a
/// bumped generation, so a stale handle never aliases a newer node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    slot: u32,
    generation: u32,
}

impl NodeId {
    #[inline]
    pub(crate) fn new(slot: usize, generation: u32) -> Self {
        Self {
            slot: slot as u32,
            generation,
        }
    }

    /// Returns the arena slot.
    #[inline]
    pub fn index(self) -> u32 {
        self.slot
    }

    /// How many times the slot had been recycled when this handle was issued.
    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.slot as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "NodeId({})", self.slot)
        } else {
            write!(f, "NodeId({}v{})", self.slot, self.generation)
        }
    }
}

/// One arena slot.
#[derive(Debug, Default)]
pub(crate) struct Entry {
    pub(crate) generation: u32,
    pub(crate) node: Option<NodeKind>,
}

impl Entry {
    /// The live node, if `id` is the slot's current generation.
    pub(crate) fn get(&self, id: NodeId) -> Option<&NodeKind> {
        if self.generation == id.generation {
            self.node.as_ref()
        } else {
            None
        }
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeKind> {
        if self.generation == id.generation {
            self.node.as_mut()
        } else {
            None
        }
    }
}
