//! Vector length node.

use crate::math::length;
use crate::node::{Delay, Node, Registers};

/// Euclidean length of `n` inputs as a single output.
#[derive(Clone, Debug)]
pub struct Magnitude {
    regs: Registers,
}

impl Magnitude {
    /// Creates a magnitude node over `n` inputs.
    pub fn new(n: usize) -> Self {
        Self {
            regs: Registers::invalidated(n, 1),
        }
    }
}

impl Node for Magnitude {
    fn registers(&self) -> &Registers {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    fn update(&mut self) -> Delay {
        let len = length(self.regs.inputs());
        self.regs.outputs_mut()[0] = len;
        self.regs.set_invalidated(false);
        Delay::Immediate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let node = Magnitude::new(3);
        assert!(node.is_invalidated());
        assert_eq!(node.inputs().len(), 3);
        assert_eq!(node.outputs(), &[0.0]);
    }

    #[test]
    fn computes_length() {
        let mut node = Magnitude::new(3);
        node.inputs_mut().copy_from_slice(&[2.0, 3.0, 6.0]);
        assert_eq!(node.update(), Delay::Immediate);
        assert!((node.outputs()[0] - 7.0).abs() < 1e-6);
        assert!(!node.is_invalidated());
    }
}
