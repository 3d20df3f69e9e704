//! Time-gated emission.

use std::fmt;
use std::sync::Arc;

use super::NodeConfigError;
use crate::clock::Clock;
use crate::node::{Delay, Node, Registers};

/// Default minimum period between emissions, in milliseconds.
pub const DEFAULT_MIN_PERIOD_MS: u64 = 250;

/// How buffered values combine with each new input.
#[derive(Clone, Copy, Default)]
pub enum Gate {
    /// Keep only the newest input.
    #[default]
    Latest,
    /// Hold the largest value seen since the last emission.
    Max,
    /// Accumulate every input since the last emission.
    Sum,
    /// Caller-supplied `(buffered, input) -> buffered`.
    Custom(fn(f32, f32) -> f32),
}

impl Gate {
    /// Combines a buffered value with a new input.
    #[inline]
    pub fn apply(self, buffered: f32, input: f32) -> f32 {
        match self {
            Self::Latest => input,
            Self::Max => buffered.max(input),
            Self::Sum => buffered + input,
            Self::Custom(f) => f(buffered, input),
        }
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("Latest"),
            Self::Max => f.write_str("Max"),
            Self::Sum => f.write_str("Sum"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Limits how often values pass through.
///
/// Every update folds the inputs into a buffer through the [`Gate`]. When at
/// least `min_period` has elapsed since the previous emission the buffer is
/// copied to the outputs and restarted from the latest raw input. When the
/// call comes too early the node raises its invalidated flag and asks to be
/// revisited after the remaining time, so a buffered value is never stranded.
///
/// In constant-rate mode the limiter stays invalidated after emitting, which
/// keeps it ticking once per period even with no new input.
#[derive(Clone)]
pub struct RateLimiter {
    regs: Registers,
    buffer: Vec<f32>,
    min_period: u64,
    gate: Gate,
    constant_rate: bool,
    last_emit: Option<u64>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Creates a one-shot limiter with the [`Gate::Latest`] gate.
    pub fn new(
        min_period: u64,
        n: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeConfigError> {
        Self::builder(min_period, n).build(clock)
    }

    /// Starts a builder for the less common knobs.
    pub fn builder(min_period: u64, n: usize) -> RateLimiterBuilder {
        RateLimiterBuilder {
            min_period,
            n,
            gate: Gate::Latest,
            init: 0.0,
            constant_rate: false,
        }
    }

    /// Minimum milliseconds between emissions.
    pub fn min_period(&self) -> u64 {
        self.min_period
    }

    /// Whether the limiter re-emits every period.
    pub fn is_constant_rate(&self) -> bool {
        self.constant_rate
    }

    /// Currently buffered values.
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("regs", &self.regs)
            .field("buffer", &self.buffer)
            .field("min_period", &self.min_period)
            .field("gate", &self.gate)
            .field("constant_rate", &self.constant_rate)
            .field("last_emit", &self.last_emit)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RateLimiter`].
#[derive(Clone, Copy, Debug)]
pub struct RateLimiterBuilder {
    min_period: u64,
    n: usize,
    gate: Gate,
    init: f32,
    constant_rate: bool,
}

impl RateLimiterBuilder {
    /// Sets the gate function.
    pub fn gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Initial buffer and output value.
    pub fn init(mut self, init: f32) -> Self {
        self.init = init;
        self
    }

    /// Re-emit every period instead of once per input change.
    pub fn constant_rate(mut self, constant_rate: bool) -> Self {
        self.constant_rate = constant_rate;
        self
    }

    /// Builds the limiter. The period must be non-zero.
    pub fn build(self, clock: Arc<dyn Clock>) -> Result<RateLimiter, NodeConfigError> {
        if self.min_period == 0 {
            return Err(NodeConfigError::InvalidPeriod(self.min_period));
        }
        let mut regs = Registers::new(self.n, self.n);
        regs.outputs_mut().iter_mut().for_each(|o| *o = self.init);
        regs.set_invalidated(self.constant_rate);
        Ok(RateLimiter {
            regs,
            buffer: vec![self.init; self.n],
            min_period: self.min_period,
            gate: self.gate,
            constant_rate: self.constant_rate,
            last_emit: None,
            clock,
        })
    }
}

impl Node for RateLimiter {
    fn registers(&self) -> &Registers {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    fn update(&mut self) -> Delay {
        let gate = self.gate;
        for (buffered, &input) in self.buffer.iter_mut().zip(self.regs.inputs()) {
            *buffered = gate.apply(*buffered, input);
        }

        let now = self.clock.now_ms();
        if let Some(last) = self.last_emit {
            let elapsed = now.saturating_sub(last);
            if elapsed < self.min_period {
                self.regs.set_invalidated(true);
                return Delay::after(self.min_period - elapsed);
            }
        }

        self.last_emit = Some(now);
        self.regs.outputs_mut().copy_from_slice(&self.buffer);
        self.buffer.copy_from_slice(self.regs.inputs());
        self.regs.set_invalidated(self.constant_rate);
        Delay::Immediate
    }
}
