//! The fixed node catalogue.
//!
//! [`NodeKind`] is the closed set of node types the graph can hold. Each
//! variant wraps a concrete node; dispatch is a plain `match`, so there is
//! no plugin surface and every kind is known at compile time.

mod envelope;
mod gravity;
mod magnitude;
mod passthrough;
mod quantizer;
mod rate_limiter;
mod shake;
mod sink;

pub use envelope::Envelope;
pub use gravity::{DEFAULT_GRAVITY_CUTOFF, NormalisedGravity};
pub use magnitude::Magnitude;
pub use passthrough::Passthrough;
pub use quantizer::{DEFAULT_STEP_COUNT, Quantizer};
pub use rate_limiter::{DEFAULT_MIN_PERIOD_MS, Gate, RateLimiter, RateLimiterBuilder};
pub use shake::{DEFAULT_SHAKE_FULL_SCALE, DEFAULT_SHAKE_PERIOD_MS, ShakeIntensity};
pub use sink::{Sink, SinkCallback};

use thiserror::Error;

use crate::node::{Delay, Node, Registers};

/// Rejected node parameters.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NodeConfigError {
    /// A quantizer needs at least two levels.
    #[error("step count must be greater than 1, got {0}")]
    InvalidStepCount(u32),

    /// Dead zone must lie in [0, 0.5).
    #[error("dead zone must be in [0, 0.5), got {0}")]
    InvalidDeadZone(f32),

    /// Rate-limit periods must be non-zero.
    #[error("period must be greater than 0 ms, got {0}")]
    InvalidPeriod(u64),

    /// Scale factors must be positive.
    #[error("scale must be positive, got {0}")]
    InvalidScale(f32),
}

/// Every node type the graph can hold.
#[derive(Debug)]
pub enum NodeKind {
    /// See [`Passthrough`].
    Passthrough(Passthrough),
    /// See [`Envelope`].
    Envelope(Envelope),
    /// See [`Magnitude`].
    Magnitude(Magnitude),
    /// See [`NormalisedGravity`].
    NormalisedGravity(NormalisedGravity),
    /// See [`Quantizer`].
    Quantizer(Quantizer),
    /// See [`RateLimiter`].
    RateLimiter(RateLimiter),
    /// See [`ShakeIntensity`].
    ShakeIntensity(ShakeIntensity),
    /// See [`Sink`].
    Sink(Sink),
}

macro_rules! dispatch {
    ($self:expr, $node:ident => $body:expr) => {
        match $self {
            NodeKind::Passthrough($node) => $body,
            NodeKind::Envelope($node) => $body,
            NodeKind::Magnitude($node) => $body,
            NodeKind::NormalisedGravity($node) => $body,
            NodeKind::Quantizer($node) => $body,
            NodeKind::RateLimiter($node) => $body,
            NodeKind::ShakeIntensity($node) => $body,
            NodeKind::Sink($node) => $body,
        }
    };
}

impl NodeKind {
    /// Short human-readable name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Passthrough(_) => "passthrough",
            Self::Envelope(_) => "envelope",
            Self::Magnitude(_) => "magnitude",
            Self::NormalisedGravity(_) => "gravity",
            Self::Quantizer(_) => "quantizer",
            Self::RateLimiter(_) => "rate_limiter",
            Self::ShakeIntensity(_) => "shake",
            Self::Sink(_) => "sink",
        }
    }
}

impl Node for NodeKind {
    fn registers(&self) -> &Registers {
        dispatch!(self, node => node.registers())
    }

    fn registers_mut(&mut self) -> &mut Registers {
        dispatch!(self, node => node.registers_mut())
    }

    fn update(&mut self) -> Delay {
        dispatch!(self, node => node.update())
    }

    fn has_side_effects(&self) -> bool {
        dispatch!(self, node => node.has_side_effects())
    }
}

macro_rules! impl_from_node {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for NodeKind {
                fn from(node: $variant) -> Self {
                    Self::$variant(node)
                }
            }
        )*
    };
}

impl_from_node!(
    Passthrough,
    Envelope,
    Magnitude,
    NormalisedGravity,
    Quantizer,
    RateLimiter,
    ShakeIntensity,
    Sink,
);
