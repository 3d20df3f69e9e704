//! Shake detector built from a magnitude and a peak-holding limiter.

use std::sync::Arc;

use super::{Gate, Magnitude, NodeConfigError, RateLimiter};
use crate::clock::Clock;
use crate::math::clamp01;
use crate::node::{Delay, Node, Registers};

/// Default sampling period of the internal peak hold, in milliseconds.
pub const DEFAULT_SHAKE_PERIOD_MS: u64 = 50;

/// Default linear acceleration (m/s²) that maps to full intensity.
pub const DEFAULT_SHAKE_FULL_SCALE: f32 = 25.0;

/// Turns a linear-acceleration vector into a [0, 1] shake intensity.
///
/// The vector length feeds a constant-rate, max-hold [`RateLimiter`], so the
/// output is the peak acceleration of each period divided by the full-scale
/// value. The inner nodes are private to the composite and never appear in
/// the graph.
#[derive(Clone, Debug)]
pub struct ShakeIntensity {
    regs: Registers,
    magnitude: Magnitude,
    hold: RateLimiter,
    full_scale: f32,
}

impl ShakeIntensity {
    /// Creates a detector with the default period and scale.
    pub fn new(clock: Arc<dyn Clock>) -> Result<Self, NodeConfigError> {
        Self::with_settings(DEFAULT_SHAKE_PERIOD_MS, DEFAULT_SHAKE_FULL_SCALE, clock)
    }

    /// Creates a detector with a custom sampling period and full-scale value.
    pub fn with_settings(
        period_ms: u64,
        full_scale: f32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeConfigError> {
        if full_scale.is_nan() || full_scale <= 0.0 {
            return Err(NodeConfigError::InvalidScale(full_scale));
        }
        let hold = RateLimiter::builder(period_ms, 1)
            .gate(Gate::Max)
            .constant_rate(true)
            .build(clock)?;
        Ok(Self {
            regs: Registers::new(3, 1),
            magnitude: Magnitude::new(3),
            hold,
            full_scale,
        })
    }

    /// Acceleration that saturates the output.
    pub fn full_scale(&self) -> f32 {
        self.full_scale
    }
}

impl Node for ShakeIntensity {
    fn registers(&self) -> &Registers {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    fn update(&mut self) -> Delay {
        self.magnitude.inputs_mut().copy_from_slice(self.regs.inputs());
        self.magnitude.update();
        self.hold.inputs_mut()[0] = self.magnitude.outputs()[0];

        let delay = self.hold.update();
        self.regs.outputs_mut()[0] = clamp01(self.hold.outputs()[0] / self.full_scale);
        self.regs.set_invalidated(self.hold.is_invalidated());
        delay
    }
}
