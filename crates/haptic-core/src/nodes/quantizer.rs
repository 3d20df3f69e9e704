//! Step quantizer with hysteresis.

use super::NodeConfigError;
use crate::math::clamp01;
use crate::node::{Delay, Node, Registers};

/// Default number of output levels.
pub const DEFAULT_STEP_COUNT: u32 = 2;

/// Maps a [0, 1] input onto `step_count` evenly spaced levels.
///
/// `level = round(clamp01(x) * (step_count - 1))`, output is
/// `level / (step_count - 1)`. A transition of exactly one level is only
/// accepted once the input has crossed the rounding boundary by `dead_zone`
/// of a step, which keeps a noisy input near a boundary from chattering.
/// Larger jumps are always accepted.
#[derive(Clone, Debug)]
pub struct Quantizer {
    regs: Registers,
    step_count: u32,
    dead_zone: f32,
    last_level: Option<u32>,
}

impl Quantizer {
    /// Creates a quantizer.
    ///
    /// `step_count` must be greater than 1 and `dead_zone` must lie in
    /// `[0, 0.5)`.
    pub fn new(step_count: u32, dead_zone: f32) -> Result<Self, NodeConfigError> {
        validate_step_count(step_count)?;
        validate_dead_zone(dead_zone)?;
        Ok(Self {
            regs: Registers::new(1, 1),
            step_count,
            dead_zone,
            last_level: None,
        })
    }

    /// Number of output levels.
    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Changes the number of levels. The next update always reports a change.
    pub fn set_step_count(&mut self, step_count: u32) -> Result<(), NodeConfigError> {
        validate_step_count(step_count)?;
        self.step_count = step_count;
        self.last_level = None;
        self.regs.set_invalidated(true);
        Ok(())
    }

    /// Hysteresis as a fraction of one step.
    pub fn dead_zone(&self) -> f32 {
        self.dead_zone
    }

    /// Changes the hysteresis.
    pub fn set_dead_zone(&mut self, dead_zone: f32) -> Result<(), NodeConfigError> {
        validate_dead_zone(dead_zone)?;
        self.dead_zone = dead_zone;
        Ok(())
    }

    fn accepts(&self, last: u32, level: u32, scaled: f32) -> bool {
        if last.abs_diff(level) != 1 {
            return true;
        }
        let boundary = level as f32;
        if level > last {
            scaled >= boundary - 0.5 + self.dead_zone
        } else {
            scaled <= boundary + 0.5 - self.dead_zone
        }
    }
}

fn validate_step_count(step_count: u32) -> Result<(), NodeConfigError> {
    if step_count <= 1 {
        return Err(NodeConfigError::InvalidStepCount(step_count));
    }
    Ok(())
}

fn validate_dead_zone(dead_zone: f32) -> Result<(), NodeConfigError> {
    if !(0.0..0.5).contains(&dead_zone) {
        return Err(NodeConfigError::InvalidDeadZone(dead_zone));
    }
    Ok(())
}

impl Node for Quantizer {
    fn registers(&self) -> &Registers {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    fn update(&mut self) -> Delay {
        self.regs.set_invalidated(false);
        let divisions = (self.step_count - 1) as f32;
        let scaled = clamp01(self.regs.inputs()[0]) * divisions;
        let level = scaled.round() as u32;

        let next = match self.last_level {
            None => level,
            Some(last) if last == level || !self.accepts(last, level, scaled) => {
                return Delay::NoChange;
            }
            Some(_) => level,
        };

        self.last_level = Some(next);
        self.regs.outputs_mut()[0] = next as f32 / divisions;
        Delay::Immediate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(node: &mut Quantizer, value: f32) -> Delay {
        node.inputs_mut()[0] = value;
        node.update()
    }

    #[test]
    fn defaults_are_binary() {
        let mut node = Quantizer::new(DEFAULT_STEP_COUNT, 0.0).unwrap();
        feed(&mut node, 0.49);
        assert_eq!(node.outputs(), &[0.0]);
        feed(&mut node, 0.5);
        assert_eq!(node.outputs(), &[1.0]);
    }

    #[test]
    fn rejects_bad_configuration() {
        assert_eq!(
            Quantizer::new(1, 0.0).unwrap_err(),
            NodeConfigError::InvalidStepCount(1)
        );
        assert_eq!(
            Quantizer::new(5, 0.5).unwrap_err(),
            NodeConfigError::InvalidDeadZone(0.5)
        );
        assert!(Quantizer::new(5, -0.1).is_err());

        let mut node = Quantizer::new(5, 0.0).unwrap();
        assert!(node.set_step_count(0).is_err());
        assert!(node.set_dead_zone(0.7).is_err());
        assert_eq!(node.step_count(), 5);
        assert_eq!(node.dead_zone(), 0.0);
    }

    #[test]
    fn five_step_boundaries() {
        let mut node = Quantizer::new(5, 0.0).unwrap();
        let cases = [
            (0.0, 0.0),
            (0.12499, 0.0),
            (0.125, 0.25),
            (0.37499, 0.25),
            (0.375, 0.5),
            (0.62499, 0.5),
            (0.625, 0.75),
            (0.87499, 0.75),
            (0.875, 1.0),
            (1.0, 1.0),
        ];
        for (input, expected) in cases {
            feed(&mut node, input);
            assert_eq!(node.outputs()[0], expected, "input {input}");
        }
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        let mut node = Quantizer::new(5, 0.0).unwrap();
        feed(&mut node, 7.0);
        assert_eq!(node.outputs(), &[1.0]);
        feed(&mut node, -3.0);
        assert_eq!(node.outputs(), &[0.0]);
    }

    #[test]
    fn update_reports_level_changes_only() {
        let mut node = Quantizer::new(5, 0.0).unwrap();
        assert_eq!(feed(&mut node, 0.0), Delay::Immediate);
        assert_eq!(feed(&mut node, 0.12), Delay::NoChange);
        assert_eq!(feed(&mut node, 0.4), Delay::Immediate);
        assert_eq!(node.outputs(), &[0.5]);
        assert_eq!(feed(&mut node, 0.2), Delay::Immediate);
        assert_eq!(node.outputs(), &[0.25]);
        assert_eq!(feed(&mut node, 0.9), Delay::Immediate);
        assert_eq!(node.outputs(), &[1.0]);
        assert_eq!(feed(&mut node, 0.875), Delay::NoChange);
    }

    #[test]
    fn first_update_reports_change_even_at_zero() {
        let mut node = Quantizer::new(3, 0.2).unwrap();
        assert_eq!(feed(&mut node, 0.0), Delay::Immediate);
    }

    #[test]
    fn dead_zone_delays_upward_step() {
        let mut node = Quantizer::new(11, 0.1).unwrap();
        feed(&mut node, 0.3);
        assert_eq!(node.outputs(), &[0.3]);
        assert_eq!(feed(&mut node, 0.359), Delay::NoChange);
        assert_eq!(node.outputs(), &[0.3]);
        assert_eq!(feed(&mut node, 0.361), Delay::Immediate);
        assert_eq!(node.outputs(), &[0.4]);
    }

    #[test]
    fn dead_zone_delays_downward_step() {
        let mut node = Quantizer::new(11, 0.1).unwrap();
        feed(&mut node, 0.1);
        assert_eq!(feed(&mut node, 0.041), Delay::NoChange);
        assert_eq!(node.outputs(), &[0.1]);
        assert_eq!(feed(&mut node, 0.039), Delay::Immediate);
        assert_eq!(node.outputs(), &[0.0]);
    }

    #[test]
    fn dead_zone_ignored_for_multi_step_jumps() {
        let mut node = Quantizer::new(11, 0.4).unwrap();
        feed(&mut node, 0.0);
        assert_eq!(feed(&mut node, 0.2), Delay::Immediate);
        assert_eq!(node.outputs(), &[0.2]);
    }

    #[test]
    fn changing_step_count_forces_refresh() {
        let mut node = Quantizer::new(5, 0.0).unwrap();
        feed(&mut node, 0.5);
        node.set_step_count(3).unwrap();
        assert!(node.is_invalidated());
        assert_eq!(node.update(), Delay::Immediate);
        assert_eq!(node.outputs(), &[0.5]);
    }
}
