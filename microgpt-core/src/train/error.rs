//! Errors produced before a training run starts.

use thiserror::Error;

use crate::config::ConfigError;
use crate::model::ModelError;

/// Errors produced by the training module.
///
/// Everything is checked before the first step; once a run starts, steps cannot fail.
/// A diverging loss is not an error: it is reported in [`StepInfo`](super::StepInfo).
#[derive(Debug, Error)]
pub enum TrainError {
    /// Optimizer hyperparameters failed validation.
    #[error("optimizer config: {0}")]
    Config(#[from] ConfigError),

    /// There is nothing to train on.
    #[error("no training documents")]
    NoDocuments,

    /// A token sequence cannot produce a next-token loss.
    #[error("document {index}: need at least 2 tokens, got {len}")]
    SequenceTooShort { index: usize, len: usize },

    /// A token sequence holds an id the model has no embedding for.
    #[error("document {index}: token id {token} out of range for vocab_size {vocab_size}")]
    InvalidToken {
        index: usize,
        token: usize,
        vocab_size: usize,
    },

    /// Optimizer state was sized for a different model.
    #[error("optimizer state has {actual} entries, model has {expected} parameters")]
    StateMismatch { expected: usize, actual: usize },

    /// A snapshot could not be turned back into a model.
    #[error(transparent)]
    Model(#[from] ModelError),
}
