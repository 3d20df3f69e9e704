//! Gravity direction node.

use crate::math::{clamp01, normalise};
use crate::node::{Delay, Node, Registers};

/// Default length below which a gravity reading is treated as absent.
pub const DEFAULT_GRAVITY_CUTOFF: f32 = 0.0001;

/// Normalises a 3-axis gravity reading and clamps each axis to [0, 1].
///
/// Tilting the device toward an axis drives that output toward 1. Readings
/// shorter than the cutoff produce zeros.
#[derive(Clone, Debug)]
pub struct NormalisedGravity {
    regs: Registers,
    cutoff: f32,
}

impl NormalisedGravity {
    /// Creates a gravity node with [`DEFAULT_GRAVITY_CUTOFF`].
    pub fn new() -> Self {
        Self::with_cutoff(DEFAULT_GRAVITY_CUTOFF)
    }

    /// Creates a gravity node with a custom length cutoff.
    pub fn with_cutoff(cutoff: f32) -> Self {
        Self {
            regs: Registers::new(3, 3),
            cutoff,
        }
    }

    /// Length at or below which output is zeroed.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }
}

impl Default for NormalisedGravity {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for NormalisedGravity {
    fn registers(&self) -> &Registers {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    fn update(&mut self) -> Delay {
        let cutoff = self.cutoff;
        let (inputs, outputs) = self.regs.split_mut();
        normalise(inputs, outputs, cutoff);
        outputs.iter_mut().for_each(|o| *o = clamp01(*o));
        self.regs.set_invalidated(false);
        Delay::Immediate
    }
}
