//! Integration tests for multi-node pipelines.
//!
//! These exercise node kinds together through the graph rather than in
//! isolation: a full gravity-to-actuator chain, timed revisits from a rate
//! limiter, and the periodic shake detector.

use std::sync::{Arc, Mutex};

use haptic_core::{
    ControlGraph, Delay, ManualClock, Node, NodeId, NormalisedGravity, Passthrough, Quantizer,
    RateLimiter, ShakeIntensity, Sink,
};

type Log = Arc<Mutex<Vec<Vec<f32>>>>;

fn sink(n: usize) -> (Sink, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let writer = Arc::clone(&log);
    let sink = Sink::new(n, move |values: &[f32]| {
        writer.lock().unwrap().push(values.to_vec());
    });
    (sink, log)
}

/// Ticks until the graph stops reporting pending propagation.
fn settle(graph: &mut ControlGraph) -> Option<u64> {
    for _ in 0..32 {
        let wake = graph.update().unwrap();
        if wake != Some(0) {
            return wake;
        }
    }
    panic!("graph did not settle");
}

fn last(log: &Log) -> Vec<f32> {
    log.lock().unwrap().last().cloned().unwrap_or_default()
}

struct Chain {
    graph: ControlGraph,
    gravity: NodeId,
    log: Log,
    clock: Arc<ManualClock>,
}

/// gravity.z -> select -> quantizer(5) -> rate limiter(100 ms) -> sink
fn gravity_chain() -> Chain {
    let clock = Arc::new(ManualClock::new(0));
    let mut graph = ControlGraph::new();
    let gravity = graph.add_node(NormalisedGravity::new());
    let select = graph.add_node(Passthrough::new(1));
    let quantizer = graph.add_node(Quantizer::new(5, 0.0).unwrap());
    let limiter = graph.add_node(RateLimiter::new(100, 1, clock.clone()).unwrap());
    let (sink, log) = sink(1);
    let sink = graph.add_node(sink);

    graph.link(gravity, 2, select, 0).unwrap();
    graph.link(select, 0, quantizer, 0).unwrap();
    graph.link(quantizer, 0, limiter, 0).unwrap();
    graph.link(limiter, 0, sink, 0).unwrap();
    Chain {
        graph,
        gravity,
        log,
        clock,
    }
}

#[test]
fn gravity_reaches_actuator() {
    let mut chain = gravity_chain();
    settle(&mut chain.graph);

    chain.graph.push_inputs(chain.gravity, &[0.0, 0.0, 9.8]).unwrap();
    assert_eq!(settle(&mut chain.graph), None);
    assert_eq!(last(&chain.log), vec![1.0]);
}

#[test]
fn rate_limited_value_is_delivered_after_revisit() {
    let mut chain = gravity_chain();
    chain.graph.push_inputs(chain.gravity, &[0.0, 0.0, 9.8]).unwrap();
    settle(&mut chain.graph);
    assert_eq!(last(&chain.log), vec![1.0]);

    // Ten milliseconds later the device tilts flat: the limiter holds it back.
    chain.clock.advance(10);
    chain.graph.push_inputs(chain.gravity, &[9.8, 0.0, 0.0]).unwrap();
    assert_eq!(settle(&mut chain.graph), Some(90));
    assert_eq!(last(&chain.log), vec![1.0]);

    chain.clock.advance(90);
    assert_eq!(settle(&mut chain.graph), None);
    assert_eq!(last(&chain.log), vec![0.0]);
}

#[test]
fn unlinked_branch_is_not_evaluated() {
    let mut chain = gravity_chain();
    settle(&mut chain.graph);
    let sorted = chain.graph.sorted_nodes().len();

    let extra = chain.graph.add_node(Passthrough::new(3));
    chain.graph.link(chain.gravity, 0, extra, 0).unwrap();
    assert!(!chain.graph.is_node_used(extra));
    assert_eq!(chain.graph.sorted_nodes().len(), sorted);
}

#[test]
fn shake_requests_periodic_revisits() {
    let clock = Arc::new(ManualClock::new(0));
    let mut graph = ControlGraph::new();
    let accel = graph.add_node(Passthrough::new(3));
    let shake = graph.add_node(ShakeIntensity::new(clock.clone()).unwrap());
    let (sink, log) = sink(1);
    let sink = graph.add_node(sink);
    for axis in 0..3 {
        graph.link(accel, axis, shake, axis).unwrap();
    }
    graph.link(shake, 0, sink, 0).unwrap();

    graph.push_inputs(accel, &[15.0, 0.0, 0.0]).unwrap();
    let wake = settle(&mut graph);
    assert_eq!(last(&log), vec![0.6]);
    assert!(matches!(wake, Some(ms) if ms > 0 && ms <= 50));

    // The peak is held through the next emission, then replaced by the
    // current reading.
    graph.push_inputs(accel, &[5.0, 0.0, 0.0]).unwrap();
    assert_eq!(settle(&mut graph), Some(50));
    assert_eq!(last(&log), vec![0.6]);

    clock.advance(50);
    settle(&mut graph);
    assert_eq!(last(&log), vec![0.6]);

    clock.advance(50);
    settle(&mut graph);
    assert!((last(&log)[0] - 0.2).abs() < 1e-6);
    assert!(graph.node(shake).unwrap().is_invalidated());
}

#[test]
fn node_delay_folds_into_minimum() {
    let clock = Arc::new(ManualClock::new(0));
    let mut graph = ControlGraph::new();
    let (sink_a, _) = sink(1);
    let (sink_b, _) = sink(1);
    let fast = graph.add_node(RateLimiter::new(30, 1, clock.clone()).unwrap());
    let slow = graph.add_node(RateLimiter::new(80, 1, clock.clone()).unwrap());
    let a = graph.add_node(sink_a);
    let b = graph.add_node(sink_b);
    graph.link(fast, 0, a, 0).unwrap();
    graph.link(slow, 0, b, 0).unwrap();

    graph.push_inputs(fast, &[1.0]).unwrap();
    graph.push_inputs(slow, &[1.0]).unwrap();
    settle(&mut graph);

    clock.advance(5);
    graph.push_inputs(fast, &[2.0]).unwrap();
    graph.push_inputs(slow, &[2.0]).unwrap();
    assert_eq!(graph.update().unwrap(), Some(25));

    let limiter = graph.node_mut(slow).unwrap();
    assert_eq!(limiter.update(), Delay::After(75));
}
