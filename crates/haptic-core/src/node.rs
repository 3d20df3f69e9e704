//! The node contract shared by every entry in the catalogue.
//!
//! A node owns two fixed-size register arrays. The graph writes upstream
//! values into `inputs`, calls [`Node::update`], and reads `outputs` back out.
//! The returned [`Delay`] tells the scheduler what happened:
//!
//! | Delay | Raw | Meaning |
//! |---|---|---|
//! | [`Delay::Immediate`] | `0` | Outputs changed; downstream sees them next tick |
//! | [`Delay::NoChange`] | `-1` | Nothing to propagate; wait for new input |
//! | [`Delay::After`] | `> 0` | Revisit this node after the given milliseconds |
//!
//! The `invalidated` flag is sticky: a node that sets it is updated on the
//! next tick even if none of its inputs changed.

/// Raw encoding of [`Delay::Immediate`].
pub const IMMEDIATE: i64 = 0;

/// Raw encoding of [`Delay::NoChange`].
pub const NO_CHANGE: i64 = -1;

/// Scheduling request returned by [`Node::update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Delay {
    /// Outputs changed and should propagate.
    Immediate,
    /// No output change; only a new input wakes this node again.
    NoChange,
    /// Revisit after this many milliseconds (always non-zero).
    After(u64),
}

impl Delay {
    /// Decodes the signed wire form (`0`, `-1`, or a positive millisecond count).
    ///
    /// Any other negative value is treated as [`Delay::NoChange`].
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            IMMEDIATE => Self::Immediate,
            ms if ms > 0 => Self::After(ms as u64),
            _ => Self::NoChange,
        }
    }

    /// Encodes into the signed wire form.
    pub fn as_raw(self) -> i64 {
        match self {
            Self::Immediate => IMMEDIATE,
            Self::NoChange => NO_CHANGE,
            Self::After(ms) => ms.min(i64::MAX as u64) as i64,
        }
    }

    /// Builds a revisit request; zero collapses to [`Delay::Immediate`].
    pub fn after(ms: u64) -> Self {
        if ms == 0 { Self::Immediate } else { Self::After(ms) }
    }
}

/// Input and output registers plus the invalidation flag.
///
/// Register lengths are fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Registers {
    inputs: Vec<f32>,
    outputs: Vec<f32>,
    invalidated: bool,
}

impl Registers {
    /// Creates zeroed registers.
    pub fn new(input_count: usize, output_count: usize) -> Self {
        Self {
            inputs: vec![0.0; input_count],
            outputs: vec![0.0; output_count],
            invalidated: false,
        }
    }

    /// Same as [`new`](Self::new) with the invalidation flag raised.
    pub fn invalidated(input_count: usize, output_count: usize) -> Self {
        Self {
            invalidated: true,
            ..Self::new(input_count, output_count)
        }
    }

    /// Input register values.
    pub fn inputs(&self) -> &[f32] {
        &self.inputs
    }

    /// Mutable input registers.
    pub fn inputs_mut(&mut self) -> &mut [f32] {
        &mut self.inputs
    }

    /// Output register values.
    pub fn outputs(&self) -> &[f32] {
        &self.outputs
    }

    /// Mutable output registers.
    pub fn outputs_mut(&mut self) -> &mut [f32] {
        &mut self.outputs
    }

    /// Disjoint borrow of both arrays.
    pub fn split_mut(&mut self) -> (&[f32], &mut [f32]) {
        (&self.inputs, &mut self.outputs)
    }

    /// Whether the node must be updated on the next tick.
    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Raises or clears the invalidation flag.
    pub fn set_invalidated(&mut self, invalidated: bool) {
        self.invalidated = invalidated;
    }

    /// Returns the flag and clears it.
    pub fn take_invalidated(&mut self) -> bool {
        std::mem::replace(&mut self.invalidated, false)
    }
}

/// A processing unit in the control graph.
///
/// Implementors only supply [`registers`](Self::registers),
/// [`registers_mut`](Self::registers_mut) and [`update`](Self::update); the
/// register accessors are provided.
pub trait Node: Send {
    /// Shared register state.
    fn registers(&self) -> &Registers;

    /// Mutable register state.
    fn registers_mut(&mut self) -> &mut Registers;

    /// Recomputes outputs from inputs.
    fn update(&mut self) -> Delay;

    /// Side-effecting nodes are never pruned from the schedule.
    fn has_side_effects(&self) -> bool {
        false
    }

    /// Input register values.
    fn inputs(&self) -> &[f32] {
        self.registers().inputs()
    }

    /// Mutable input registers.
    fn inputs_mut(&mut self) -> &mut [f32] {
        self.registers_mut().inputs_mut()
    }

    /// Output register values.
    fn outputs(&self) -> &[f32] {
        self.registers().outputs()
    }

    /// Whether the next tick must update this node.
    fn is_invalidated(&self) -> bool {
        self.registers().is_invalidated()
    }

    /// Raises or clears the invalidation flag.
    fn set_invalidated(&mut self, invalidated: bool) {
        self.registers_mut().set_invalidated(invalidated);
    }
}
