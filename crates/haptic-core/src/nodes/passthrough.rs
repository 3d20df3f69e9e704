//! Identity node.

use crate::node::{Delay, Node, Registers};

/// Copies `n` inputs to `n` outputs.
///
/// Used as a named junction: the manual-input register bank, the per-device
/// output selector and the linear-acceleration source are all passthroughs.
/// Reports a change only when the outputs actually moved or the node was
/// explicitly invalidated, so idle re-binds do not ripple downstream.
#[derive(Clone, Debug)]
pub struct Passthrough {
    regs: Registers,
}

impl Passthrough {
    /// Creates a passthrough with `n` lanes.
    pub fn new(n: usize) -> Self {
        Self {
            regs: Registers::new(n, n),
        }
    }
}

impl Node for Passthrough {
    fn registers(&self) -> &Registers {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    fn update(&mut self) -> Delay {
        let forced = self.regs.take_invalidated();
        let (inputs, outputs) = self.regs.split_mut();
        let changed = inputs != &*outputs;
        outputs.copy_from_slice(inputs);
        if changed || forced {
            Delay::Immediate
        } else {
            Delay::NoChange
        }
    }
}
