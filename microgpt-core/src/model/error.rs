//! Errors produced when building, restoring or sampling from a model.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced by the model module.
///
/// Shape disagreements between tensors inside the forward pass are wiring bugs and
/// panic instead; these variants cover inputs that come from outside the crate
/// (configuration, snapshots, prompts, checkpoint files).
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model configuration failed validation.
    #[error("model config: {0}")]
    Config(#[from] ConfigError),

    /// A model needs at least one token (the BOS token).
    #[error("vocab_size must be greater than 0")]
    EmptyVocab,

    /// The weight initializer rejected the configured standard deviation.
    #[error("weight init: {0}")]
    Init(String),

    /// A snapshot tensor does not have the shape the configuration implies.
    #[error("tensor {name}: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    Shape {
        name: String,
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    /// A snapshot has the wrong number of per-layer tensors.
    #[error("tensor {name}: expected {expected} layers, got {actual}")]
    LayerCount {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The prompt does not fit in the context window.
    #[error("prefix of {len} tokens exceeds block_size {block_size}")]
    PrefixTooLong { len: usize, block_size: usize },

    /// A prompt token is outside the vocabulary.
    #[error("token id {token} out of range for vocab_size {vocab_size}")]
    InvalidToken { token: usize, vocab_size: usize },

    /// Temperature must be finite and non-negative.
    #[error("temperature must be finite and >= 0, got {0}")]
    InvalidTemperature(f64),

    /// Reading or writing a checkpoint failed.
    #[error("checkpoint io: {0}")]
    Io(#[from] std::io::Error),

    /// A checkpoint could not be encoded or decoded.
    #[error("checkpoint json: {0}")]
    Json(#[from] serde_json::Error),
}
