//! Terminal node that hands values to the outside world.

use std::fmt;

use crate::node::{Delay, Node, Registers};

/// Callback invoked with a sink's input registers.
pub type SinkCallback = Box<dyn FnMut(&[f32]) + Send>;

/// Side-effecting terminal.
///
/// Sinks have no outputs and are never pruned. They start invalidated so a
/// freshly created sink reports its (zeroed) inputs once.
pub struct Sink {
    regs: Registers,
    callback: SinkCallback,
}

impl Sink {
    /// Creates a sink with `n` inputs.
    pub fn new(n: usize, callback: impl FnMut(&[f32]) + Send + 'static) -> Self {
        Self {
            regs: Registers::invalidated(n, 0),
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("regs", &self.regs)
            .finish_non_exhaustive()
    }
}

impl Node for Sink {
    fn registers(&self) -> &Registers {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    fn has_side_effects(&self) -> bool {
        true
    }

    fn update(&mut self) -> Delay {
        self.regs.set_invalidated(false);
        (self.callback)(self.regs.inputs());
        Delay::NoChange
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn forwards_inputs_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let mut node = Sink::new(2, move |values: &[f32]| {
            log.lock().unwrap().push(values.to_vec());
        });

        assert!(node.is_invalidated());
        assert!(node.has_side_effects());
        assert!(node.outputs().is_empty());

        node.inputs_mut().copy_from_slice(&[0.25, 0.75]);
        assert_eq!(node.update(), Delay::NoChange);
        assert!(!node.is_invalidated());
        assert_eq!(*seen.lock().unwrap(), vec![vec![0.25, 0.75]]);
    }
}
