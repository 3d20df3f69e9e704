//! Property-based tests for the control graph.
//!
//! Drives random link/unlink/remove sequences against a small graph and
//! checks structural invariants after every step.

use std::collections::BTreeSet;

use haptic_core::{ControlGraph, GraphError, Node, NodeId, Passthrough, Sink, Slot};
use proptest::prelude::*;

const NODES: usize = 6;
const LANES: usize = 2;

#[derive(Clone, Debug)]
enum Op {
    Link {
        src: usize,
        out: usize,
        dst: usize,
        input: usize,
    },
    Unlink {
        dst: usize,
        input: usize,
    },
    Remove(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0..=NODES, 0..LANES, 0..=NODES, 0..LANES)
            .prop_map(|(src, out, dst, input)| Op::Link { src, out, dst, input }),
        2 => (0..=NODES, 0..LANES).prop_map(|(dst, input)| Op::Unlink { dst, input }),
        1 => (0..NODES).prop_map(Op::Remove),
    ]
}

/// `NODES` passthroughs followed by one two-lane sink.
fn build() -> (ControlGraph, Vec<NodeId>) {
    let mut graph = ControlGraph::new();
    let mut ids: Vec<NodeId> = (0..NODES)
        .map(|_| graph.add_node(Passthrough::new(LANES)))
        .collect();
    ids.push(graph.add_node(Sink::new(LANES, |_: &[f32]| {})));
    (graph, ids)
}

fn snapshot(graph: &ControlGraph) -> (Vec<(Slot, Slot)>, Vec<NodeId>) {
    (graph.edges().collect(), graph.sorted_nodes().to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Edge views stay consistent and every input slot has at most one
    /// source, whatever the mutation sequence.
    #[test]
    fn edges_stay_consistent(ops in prop::collection::vec(op(), 1..40)) {
        let (mut graph, ids) = build();
        for op in ops {
            match op {
                Op::Link { src, out, dst, input } => {
                    let _ = graph.link(ids[src], out, ids[dst], input);
                }
                Op::Unlink { dst, input } => {
                    graph.unlink_input(ids[dst], input);
                }
                Op::Remove(n) => {
                    let _ = graph.remove_node(ids[n]);
                }
            }
            prop_assert!(graph.check_consistency().is_ok());
            let dests: BTreeSet<Slot> = graph.edges().map(|(_, dest)| dest).collect();
            prop_assert_eq!(dests.len(), graph.edge_count());
        }
    }

    /// A rejected link leaves the edge set and evaluation order untouched.
    #[test]
    fn failed_link_is_rolled_back(ops in prop::collection::vec(op(), 1..40)) {
        let (mut graph, ids) = build();
        for op in ops {
            let Op::Link { src, out, dst, input } = op else { continue };
            graph.refresh_topology().unwrap();
            let before = snapshot(&graph);
            match graph.link(ids[src], out, ids[dst], input) {
                Ok(()) => prop_assert!(graph.has_link(ids[src], out, ids[dst], input)),
                Err(err) => {
                    let expected = matches!(err, GraphError::CycleDetected)
                        || (src == NODES && matches!(err, GraphError::OutputOutOfRange { .. }));
                    prop_assert!(expected, "unexpected error {err}");
                    prop_assert_eq!(snapshot(&graph), before);
                }
            }
        }
    }

    /// Linking an occupied input replaces its source: the latest link wins.
    #[test]
    fn latest_link_wins(sources in prop::collection::vec(0..NODES, 1..10)) {
        let (mut graph, ids) = build();
        let sink = ids[NODES];
        for &src in &sources {
            graph.link(ids[src], 0, sink, 0).unwrap();
        }
        let last = *sources.last().unwrap();
        prop_assert_eq!(graph.source_of(sink, 0), Some(Slot::new(ids[last], 0)));
        prop_assert_eq!(graph.edge_count(), 1);
    }

    /// Pruning reaches a fixed point: rebuilding again changes nothing, the
    /// sink is always scheduled, and every scheduled non-sink node feeds
    /// another scheduled node.
    #[test]
    fn pruning_is_a_fixed_point(ops in prop::collection::vec(op(), 1..40)) {
        let (mut graph, ids) = build();
        for op in ops {
            if let Op::Link { src, out, dst, input } = op {
                let _ = graph.link(ids[src], out, ids[dst], input);
            }
        }
        graph.refresh_topology().unwrap();
        let scheduled: BTreeSet<NodeId> = graph.sorted_nodes().iter().copied().collect();

        // Unbinding and rebinding an edge forces a rebuild over the same edge set.
        let first = graph.edges().next();
        if let Some((source, dest)) = first {
            graph.unlink_input(dest.node, dest.index);
            graph.link(source.node, source.index, dest.node, dest.index).unwrap();
        }
        let rebuilt: BTreeSet<NodeId> = graph.sorted_nodes().iter().copied().collect();
        prop_assert_eq!(&rebuilt, &scheduled);

        prop_assert!(graph.is_node_used(ids[NODES]));
        for &id in &scheduled {
            let node = graph.node(id).unwrap();
            if node.has_side_effects() {
                continue;
            }
            let feeds_scheduled = graph
                .edges()
                .any(|(source, dest)| source.node == id && scheduled.contains(&dest.node));
            prop_assert!(feeds_scheduled, "{id} survived pruning without listeners");
        }
    }

    /// Ticking never fails on an acyclic graph and always settles.
    #[test]
    fn ticks_settle(
        ops in prop::collection::vec(op(), 1..30),
        values in prop::collection::vec(-1.0f32..=1.0f32, NODES),
    ) {
        let (mut graph, ids) = build();
        for op in ops {
            if let Op::Link { src, out, dst, input } = op {
                let _ = graph.link(ids[src], out, ids[dst], input);
            }
        }
        for (i, &value) in values.iter().enumerate() {
            graph.push_inputs(ids[i], &[value, -value]).unwrap();
        }
        let mut settled = false;
        for _ in 0..=NODES + 2 {
            if graph.update().unwrap() != Some(0) {
                settled = true;
                break;
            }
        }
        prop_assert!(settled);
    }
}
