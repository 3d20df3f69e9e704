//! Asymmetric attack/decay smoother.

use crate::node::{Delay, Node, Registers};

/// Per-lane envelope with separate rise and fall behaviour.
///
/// Rising input moves the output toward it by `attack` of the gap each
/// update. Falling input decays the output geometrically by `decay` but never
/// below the new input.
#[derive(Clone, Debug)]
pub struct Envelope {
    regs: Registers,
    attack: f32,
    decay: f32,
}

impl Envelope {
    /// Creates an envelope over `n` lanes with every output starting at `init`.
    pub fn new(attack: f32, decay: f32, n: usize, init: f32) -> Self {
        let mut regs = Registers::invalidated(n, n);
        regs.outputs_mut().iter_mut().for_each(|o| *o = init);
        Self {
            regs,
            attack,
            decay,
        }
    }

    /// Fraction of the gap closed per update when rising.
    pub fn attack(&self) -> f32 {
        self.attack
    }

    /// Geometric factor applied per update when falling.
    pub fn decay(&self) -> f32 {
        self.decay
    }
}

impl Node for Envelope {
    fn registers(&self) -> &Registers {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    fn update(&mut self) -> Delay {
        let (attack, decay) = (self.attack, self.decay);
        let (inputs, outputs) = self.regs.split_mut();
        for (out, &new) in outputs.iter_mut().zip(inputs) {
            let curr = *out;
            *out = if new < curr {
                (curr * decay).max(new)
            } else {
                curr + (new - curr) * attack
            };
        }
        self.regs.set_invalidated(false);
        Delay::Immediate
    }
}
