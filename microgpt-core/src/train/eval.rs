//! Loss on held-out documents.

use crate::config::ModelConfig;
use crate::model::{forward, NumericStateDict, StateDict};

use super::TrainError;

/// Loss of one sequence, with its graph dropped afterwards.
pub(crate) fn sequence_loss(state: &mut StateDict, tokens: &[usize]) -> f64 {
    let loss = forward(state, tokens);
    let value = state.graph().data(loss);
    state.clear_graph();
    value
}

/// Mean loss over `docs`; NaN when `docs` is empty.
///
/// Parameters and their gradients are left as they were.
///
/// # Panics
///
/// When a sequence is shorter than two tokens or holds an id outside the vocabulary.
pub fn evaluate(state: &mut StateDict, docs: &[Vec<usize>]) -> f64 {
    let total: f64 = docs.iter().map(|tokens| sequence_loss(state, tokens)).sum();
    total / docs.len() as f64
}

/// [`evaluate`] on a private copy of the model rebuilt from `snapshot`.
///
/// Needs no access to the live model, so it can run on another thread while
/// training keeps updating the original.
///
/// # Errors
///
/// [`TrainError::Model`] when `snapshot` does not match `config`.
pub fn evaluate_snapshot(
    snapshot: &NumericStateDict,
    config: &ModelConfig,
    docs: &[Vec<usize>],
) -> Result<f64, TrainError> {
    let mut state = StateDict::from_numeric(config, snapshot)?;
    Ok(evaluate(&mut state, docs))
}
