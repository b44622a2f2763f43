//! Parameter update rules.

use serde::{Deserialize, Serialize};

use super::TrainError;
use crate::autograd::{Graph, Value};
use crate::config::AdamConfig;

/// Applies one update to every parameter from its accumulated gradient.
///
/// Implementations must leave every parameter gradient at exactly zero: gradients
/// accumulate across [`Graph::backward`] calls.
pub trait Optimizer {
    /// Updates `params` in `graph` with learning rate `lr` at 0-based `step`, then zeroes their gradients.
    ///
    /// # Panics
    ///
    /// When the optimizer keeps per-parameter state sized for a different parameter count.
    fn step(&mut self, graph: &mut Graph, params: &[Value], step: usize, lr: f64);

    /// Learning rate before decay.
    fn base_learning_rate(&self) -> f64;

    /// Number of parameters the optimizer keeps state for, if it keeps any.
    fn state_len(&self) -> Option<usize> {
        None
    }
}

/// First and second moment estimates, one entry per parameter, in parameter order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AdamState {
    pub m: Vec<f64>,
    pub v: Vec<f64>,
}

impl AdamState {
    /// Zeroed moments for `num_params` parameters.
    #[must_use]
    pub fn new(num_params: usize) -> Self {
        AdamState {
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.m.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.m.is_empty()
    }
}

/// Adam with bias-corrected moments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    config: AdamConfig,
    state: AdamState,
}

impl Adam {
    /// Creates Adam for a model with `num_params` parameters.
    ///
    /// # Errors
    ///
    /// [`TrainError::Config`] when `config` fails validation.
    pub fn new(config: AdamConfig, num_params: usize) -> Result<Self, TrainError> {
        config.validate()?;
        Ok(Adam {
            config,
            state: AdamState::new(num_params),
        })
    }

    /// Resumes from saved moments.
    ///
    /// # Errors
    ///
    /// [`TrainError::Config`] when `config` fails validation, [`TrainError::StateMismatch`]
    /// when `m` and `v` differ in length.
    pub fn with_state(config: AdamConfig, state: AdamState) -> Result<Self, TrainError> {
        config.validate()?;
        if state.m.len() != state.v.len() {
            return Err(TrainError::StateMismatch {
                expected: state.m.len(),
                actual: state.v.len(),
            });
        }
        Ok(Adam { config, state })
    }

    #[must_use]
    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &AdamState {
        &self.state
    }
}

impl Optimizer for Adam {
    fn step(&mut self, graph: &mut Graph, params: &[Value], step: usize, lr: f64) {
        assert_eq!(
            params.len(),
            self.state.len(),
            "adam: state length must equal parameter count"
        );
        let AdamConfig {
            beta1,
            beta2,
            epsilon,
            ..
        } = self.config;
        // beta^t is 0 long before t leaves i32
        let t = i32::try_from(step.saturating_add(1)).unwrap_or(i32::MAX);
        let (m, v) = (&mut self.state.m, &mut self.state.v);
        for (i, &p) in params.iter().enumerate() {
            let grad = graph.grad(p);
            m[i] = beta1 * m[i] + (1.0 - beta1) * grad;
            v[i] = beta2 * v[i] + (1.0 - beta2) * grad * grad;
            let m_hat = m[i] / (1.0 - beta1.powi(t));
            let v_hat = v[i] / (1.0 - beta2.powi(t));
            graph.set_data(p, graph.data(p) - lr * m_hat / (v_hat.sqrt() + epsilon));
            graph.zero_grad(p);
        }
    }

    fn base_learning_rate(&self) -> f64 {
        self.config.learning_rate
    }

    fn state_len(&self) -> Option<usize> {
        Some(self.state.len())
    }
}

/// Plain gradient descent: `p -= lr * grad`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    #[must_use]
    pub fn new(learning_rate: f64) -> Self {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, graph: &mut Graph, params: &[Value], _step: usize, lr: f64) {
        for &p in params {
            graph.set_data(p, graph.data(p) - lr * graph.grad(p));
            graph.zero_grad(p);
        }
    }

    fn base_learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One parameter with value `p0` and gradient `grad`.
    fn param_with_grad(p0: f64, grad: f64) -> (Graph, Value) {
        let mut g = Graph::new();
        let p = g.leaf(p0);
        let y = g.mul(p, grad);
        g.backward(y);
        assert_eq!(g.grad(p), grad);
        (g, p)
    }

    #[test]
    fn adam_first_step_matches_formula() {
        let config = AdamConfig::default();
        let (b1, b2, eps) = (config.beta1, config.beta2, config.epsilon);
        let (mut g, p) = param_with_grad(0.5, 0.3);
        let mut adam = Adam::new(config, 1).unwrap();
        let lr = 0.01;

        adam.step(&mut g, &[p], 0, lr);

        let m = (1.0 - b1) * 0.3;
        let v = (1.0 - b2) * 0.3 * 0.3;
        assert_eq!(adam.state().m[0], m);
        assert_eq!(adam.state().v[0], v);
        let m_hat = m / (1.0 - b1);
        let v_hat = v / (1.0 - b2);
        assert_eq!(g.data(p), 0.5 - lr * m_hat / (v_hat.sqrt() + eps));
        // bias correction turns the first step into roughly lr * sign(grad)
        assert!((g.data(p) - (0.5 - lr)).abs() < 1e-6);
        assert_eq!(g.grad(p), 0.0);
    }

    #[test]
    fn adam_second_step_uses_step_two_bias_correction() {
        let config = AdamConfig::default();
        let (b1, b2, eps) = (config.beta1, config.beta2, config.epsilon);
        let (mut g, p) = param_with_grad(1.0, 2.0);
        let mut adam = Adam::new(config, 1).unwrap();
        adam.step(&mut g, &[p], 0, 0.0);
        assert_eq!(g.data(p), 1.0);

        let y = g.mul(p, -1.0);
        g.backward(y);
        adam.step(&mut g, &[p], 1, 0.1);

        let m = b1 * (1.0 - b1) * 2.0 + (1.0 - b1) * -1.0;
        let v = b2 * (1.0 - b2) * 4.0 + (1.0 - b2) * 1.0;
        assert!((adam.state().m[0] - m).abs() < 1e-15);
        assert!((adam.state().v[0] - v).abs() < 1e-15);
        let expected = 1.0 - 0.1 * (m / (1.0 - b1 * b1)) / ((v / (1.0 - b2 * b2)).sqrt() + eps);
        assert!((g.data(p) - expected).abs() < 1e-12);
    }

    #[test]
    fn adam_bias_correction_vanishes_at_huge_steps() {
        let config = AdamConfig::default();
        let (b1, b2, eps) = (config.beta1, config.beta2, config.epsilon);
        let (mut g, p) = param_with_grad(0.5, 0.3);
        let mut adam = Adam::new(config, 1).unwrap();

        adam.step(&mut g, &[p], 1 << 40, 0.01);

        let m = (1.0 - b1) * 0.3;
        let v = (1.0 - b2) * 0.3 * 0.3;
        assert!((g.data(p) - (0.5 - 0.01 * m / (v.sqrt() + eps))).abs() < 1e-15);
    }

    #[test]
    fn sgd_steps_against_the_gradient() {
        let (mut g, p) = param_with_grad(1.0, 4.0);
        let mut sgd = Sgd::new(0.5);
        sgd.step(&mut g, &[p], 0, 0.25);
        assert_eq!(g.data(p), 0.0);
        assert_eq!(g.grad(p), 0.0);
        assert_eq!(sgd.base_learning_rate(), 0.5);
        assert_eq!(sgd.state_len(), None);
    }

    #[test]
    fn adam_rejects_invalid_config() {
        let config = AdamConfig {
            beta1: 1.0,
            ..AdamConfig::default()
        };
        assert!(matches!(Adam::new(config, 3), Err(TrainError::Config(_))));
    }

    #[test]
    fn adam_with_state_checks_lengths() {
        let state = AdamState {
            m: vec![0.0; 2],
            v: vec![0.0; 3],
        };
        assert!(matches!(
            Adam::with_state(AdamConfig::default(), state),
            Err(TrainError::StateMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    #[should_panic(expected = "adam")]
    fn adam_panics_on_wrong_param_count() {
        let (mut g, p) = param_with_grad(1.0, 1.0);
        let mut adam = Adam::new(AdamConfig::default(), 2).unwrap();
        adam.step(&mut g, &[p], 0, 0.1);
    }
}
