//! Learning-rate decay and loss smoothing.

use serde::{Deserialize, Serialize};

/// Linear decay from `base` at step 0 to zero at `num_steps`.
///
/// Returns `base` when `num_steps == 0` and never goes below zero.
#[must_use]
pub fn learning_rate_at(base: f64, step: usize, num_steps: usize) -> f64 {
    if num_steps == 0 {
        return base;
    }
    (base * (1.0 - step as f64 / num_steps as f64)).max(0.0)
}

/// Steps between evaluations: 5% of the run, at least 1.
#[must_use]
pub fn eval_interval(num_steps: usize) -> usize {
    ((num_steps as f64 * 0.05).round() as usize).max(1)
}

/// Exponential moving average; the first sample seeds it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ema {
    value: Option<f64>,
}

impl Ema {
    /// Weight kept from the previous average on each update.
    pub const DECAY: f64 = 0.99;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `x` in and returns the new average.
    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            None => x,
            Some(prev) => Self::DECAY * prev + (1.0 - Self::DECAY) * x,
        };
        self.value = Some(next);
        next
    }

    /// Current average, `None` before the first sample.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}
