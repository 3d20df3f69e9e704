//! Criterion benchmarks for the control graph (`haptic-core::graph`).
//!
//! Two axes:
//!
//! - **Topology** - pruning plus Kahn sort over a device-shaped graph
//! - **Tick** - `update()` throughput while a change ripples to every sink
//!
//! Run with: `cargo bench -p haptic-core -- graph/`
#![allow(missing_docs)]

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use haptic_core::{
    ControlGraph, ManualClock, NodeId, NormalisedGravity, Passthrough, Quantizer, RateLimiter,
    Sink,
};

const DEVICE_COUNTS: &[usize] = &[1, 4, 16, 64];
const MOTORS: usize = 2;

/// Gravity source fanned out to `devices` two-motor actuator chains.
fn build(devices: usize) -> (ControlGraph, NodeId) {
    let clock = Arc::new(ManualClock::new(0));
    let mut graph = ControlGraph::new();
    let gravity = graph.add_node(NormalisedGravity::new());
    for _ in 0..devices {
        let output = graph.add_node(Passthrough::new(MOTORS));
        let limiter = graph.add_node(RateLimiter::new(1, MOTORS, clock.clone()).unwrap());
        let sink = graph.add_node(Sink::new(MOTORS, |values: &[f32]| {
            black_box(values);
        }));
        for motor in 0..MOTORS {
            let quantizer = graph.add_node(Quantizer::new(20, 0.1).unwrap());
            graph.link(gravity, motor, output, motor).unwrap();
            graph.link(output, motor, quantizer, 0).unwrap();
            graph.link(quantizer, 0, limiter, motor).unwrap();
            graph.link(limiter, motor, sink, motor).unwrap();
        }
    }
    (graph, gravity)
}

fn bench_topology(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/topology");
    for &devices in DEVICE_COUNTS {
        let (mut graph, gravity) = build(devices);
        group.bench_with_input(BenchmarkId::from_parameter(devices), &devices, |b, _| {
            b.iter(|| {
                // Rebinding an edge forces a full rebuild.
                let output = graph.edges().find(|(src, _)| src.node == gravity);
                if let Some((src, dst)) = output {
                    graph.link(src.node, src.index, dst.node, dst.index).unwrap();
                }
                black_box(graph.sorted_nodes().len())
            });
        });
    }
    group.finish();
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/tick");
    for &devices in DEVICE_COUNTS {
        let (mut graph, gravity) = build(devices);
        let mut flip = false;
        group.bench_with_input(BenchmarkId::from_parameter(devices), &devices, |b, _| {
            b.iter(|| {
                flip = !flip;
                let z = if flip { 9.8 } else { -9.8 };
                graph.push_inputs(gravity, &[0.0, 9.8, z]).unwrap();
                while graph.update().unwrap() == Some(0) {}
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_topology, bench_tick);
criterion_main!(benches);
