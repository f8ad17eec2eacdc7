//! Gradient clip range with the slider clamp rule

use serde::{Deserialize, Serialize};

/// Outcome of moving one end of a [`ClipRange`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundUpdate {
    /// The value that was stored
    pub applied: f32,
    /// True when the requested value crossed the other bound and was snapped,
    /// meaning the slider that sent it has to be moved to `applied`.
    pub corrected: bool,
}

/// A `[min, max]` window over a scalar with `min < max` maintained at all
/// times.
///
/// Crossing bounds are not rejected; the moving end snaps to one unit from
/// the fixed end, or to the adjacent float once a unit is lost to precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRange {
    min: f32,
    max: f32,
}

impl ClipRange {
    /// Infinite bounds are clamped to the finite `f32` range. A NaN `min`
    /// reads as zero and a NaN `max` as crossing `min`.
    pub fn new(min: f32, max: f32) -> Self {
        let min = finite(min).unwrap_or(0.0).min(step_down(f32::MAX));
        let max = match finite(max) {
            Some(max) if max > min => max,
            _ => step_up(min),
        };
        Self { min, max }
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// A NaN request leaves the range unchanged and is reported as corrected
    /// so the slider returns to the stored value.
    pub fn set_min(&mut self, value: f32) -> BoundUpdate {
        match finite(value) {
            Some(value) if value < self.max => {
                self.min = value;
                BoundUpdate { applied: value, corrected: false }
            }
            Some(_) => {
                self.min = step_down(self.max);
                BoundUpdate { applied: self.min, corrected: true }
            }
            None => BoundUpdate { applied: self.min, corrected: true },
        }
    }

    pub fn set_max(&mut self, value: f32) -> BoundUpdate {
        match finite(value) {
            Some(value) if value > self.min => {
                self.max = value;
                BoundUpdate { applied: value, corrected: false }
            }
            Some(_) => {
                self.max = step_up(self.min);
                BoundUpdate { applied: self.max, corrected: true }
            }
            None => BoundUpdate { applied: self.max, corrected: true },
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// `None` for NaN, infinities clamped to the largest finite values
fn finite(value: f32) -> Option<f32> {
    (!value.is_nan()).then(|| value.clamp(-f32::MAX, f32::MAX))
}

/// One unit above `value`, or the next representable float where a unit is
/// below its precision
fn step_up(value: f32) -> f32 {
    let stepped = value + 1.0;
    if stepped > value {
        stepped
    } else {
        next_up(value)
    }
}

fn step_down(value: f32) -> f32 {
    -step_up(-value)
}

/// Smallest float greater than a finite `value`
fn next_up(value: f32) -> f32 {
    let bits = value.to_bits();
    if value == 0.0 {
        f32::from_bits(1)
    } else if value > 0.0 {
        f32::from_bits(bits + 1)
    } else {
        f32::from_bits(bits - 1)
    }
}
