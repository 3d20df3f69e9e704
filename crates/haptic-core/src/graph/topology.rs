//! Dead-node pruning and topological ordering.
//!
//! Runs on a scratch copy of the edge relation:
//!
//! 1. Pruning: repeatedly drop nodes that have no side effects and nothing
//!    listening to them, together with their incoming edges. Removing a
//!    node can orphan its sources, so this iterates to a fixed point.
//! 2. Kahn's algorithm over the survivors, seeded with every node that has
//!    no bound input.
//!
//! Edges left over after Kahn's algorithm can only belong to a cycle.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::GraphError;
use super::edge::EdgeMap;
use super::node::{Entry, NodeId};
use crate::node::Node;

/// Computes the evaluation order of live, non-prunable nodes.
pub(crate) fn sort(nodes: &[Entry], edges: &EdgeMap) -> Result<Vec<NodeId>, GraphError> {
    let mut work = edges.clone();
    let mut alive: BTreeSet<NodeId> = nodes
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.node.is_some())
        .map(|(slot, entry)| NodeId::new(slot, entry.generation))
        .collect();

    prune(nodes, &mut alive, &mut work);

    let mut pending: BTreeMap<NodeId, usize> = alive.iter().map(|&id| (id, 0)).collect();
    for (_, dest) in work.iter() {
        let count = pending.get_mut(&dest.node).ok_or_else(|| {
            GraphError::Internal(format!("edge into pruned or missing node {}", dest.node))
        })?;
        *count += 1;
    }

    let mut queued: BTreeSet<NodeId> = BTreeSet::new();
    let mut ready: VecDeque<NodeId> = VecDeque::new();
    for (&id, &count) in &pending {
        if count == 0 {
            queued.insert(id);
            ready.push_back(id);
        }
    }

    let mut sorted = Vec::with_capacity(alive.len());
    while let Some(id) = ready.pop_front() {
        sorted.push(id);
        for half in work.take_outgoing(id) {
            let node = half.dest.node;
            let count = pending.get_mut(&node).ok_or_else(|| {
                GraphError::Internal(format!("edge into pruned or missing node {node}"))
            })?;
            *count -= 1;
            if *count == 0 {
                if !queued.insert(node) {
                    return Err(GraphError::Internal(format!("{node} scheduled twice")));
                }
                ready.push_back(node);
            }
        }
    }

    if !work.is_empty() {
        return Err(GraphError::CycleDetected);
    }
    if sorted.len() != alive.len() {
        return Err(GraphError::Internal(format!(
            "sorted {} of {} nodes",
            sorted.len(),
            alive.len()
        )));
    }
    Ok(sorted)
}

fn prune(nodes: &[Entry], alive: &mut BTreeSet<NodeId>, work: &mut EdgeMap) {
    loop {
        let dead: Vec<NodeId> = alive
            .iter()
            .copied()
            .filter(|&id| {
                let side_effects = nodes[id.slot()]
                    .get(id)
                    .is_some_and(|n| n.has_side_effects());
                !side_effects && !work.has_outgoing(id)
            })
            .collect();
        if dead.is_empty() {
            return;
        }
        for id in dead {
            alive.remove(&id);
            work.remove_node(id);
        }
    }
}
