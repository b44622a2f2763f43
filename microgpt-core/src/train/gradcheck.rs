//! Finite-difference check of the analytic gradients.

use super::eval::sequence_loss;
use crate::model::{forward, StateDict};

/// Largest absolute difference between the backward-pass gradient of the loss on
/// `tokens` and a centered finite difference `(L(p + eps) - L(p - eps)) / 2eps`,
/// over every parameter.
///
/// Stale parameter gradients are discarded first. Parameter values are restored
/// and gradients zeroed before returning.
///
/// # Panics
///
/// Under the same conditions as [`forward`].
pub fn check_gradients(state: &mut StateDict, tokens: &[usize], epsilon: f64) -> f64 {
    let params = state.params().to_vec();
    for &p in &params {
        state.graph_mut().zero_grad(p);
    }

    let loss = forward(state, tokens);
    state.graph_mut().backward(loss);
    let analytic: Vec<f64> = params.iter().map(|&p| state.graph().grad(p)).collect();
    state.clear_graph();
    for &p in &params {
        state.graph_mut().zero_grad(p);
    }

    let mut max_diff = 0.0_f64;
    for (&p, grad) in params.iter().zip(analytic) {
        let original = state.graph().data(p);
        state.graph_mut().set_data(p, original + epsilon);
        let plus = sequence_loss(state, tokens);
        state.graph_mut().set_data(p, original - epsilon);
        let minus = sequence_loss(state, tokens);
        state.graph_mut().set_data(p, original);

        let numeric = (plus - minus) / (2.0 * epsilon);
        max_diff = max_diff.max((numeric - grad).abs());
    }
    max_diff
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::config::ModelConfig;

    #[test]
    fn gradients_match_finite_differences() {
        let config = ModelConfig {
            n_embd: 4,
            n_head: 2,
            n_layer: 1,
            block_size: 4,
            init_std: 0.5,
        };
        let mut state = StateDict::init(3, &config, &mut StdRng::seed_from_u64(42)).unwrap();
        let before = state.snapshot();

        let max_diff = check_gradients(&mut state, &[2, 0, 1, 0, 2], 1e-5);
        assert!(max_diff < 1e-4, "max gradient difference {max_diff}");

        assert_eq!(state.snapshot(), before);
        assert_eq!(state.graph().len(), state.num_params());
        assert!(state.params().iter().all(|&p| state.graph().grad(p) == 0.0));
    }

    #[test]
    fn stale_gradients_are_ignored() {
        let config = ModelConfig {
            n_embd: 4,
            n_head: 1,
            n_layer: 1,
            block_size: 4,
            init_std: 0.5,
        };
        let mut state = StateDict::init(3, &config, &mut StdRng::seed_from_u64(9)).unwrap();
        let tokens = [2, 1, 0, 2];
        let loss = forward(&mut state, &tokens);
        state.graph_mut().backward(loss);
        state.clear_graph();
        assert!(state.params().iter().any(|&p| state.graph().grad(p) != 0.0));

        let max_diff = check_gradients(&mut state, &tokens, 1e-5);
        assert!(max_diff < 1e-4, "max gradient difference {max_diff}");
    }

    #[test]
    fn two_layer_gradients_match_finite_differences() {
        let config = ModelConfig {
            n_embd: 4,
            n_head: 1,
            n_layer: 2,
            block_size: 3,
            init_std: 0.3,
        };
        let mut state = StateDict::init(4, &config, &mut StdRng::seed_from_u64(7)).unwrap();
        let max_diff = check_gradients(&mut state, &[3, 1, 2, 3], 1e-5);
        assert!(max_diff < 1e-4, "max gradient difference {max_diff}");
    }
}
