//! Configuration errors.

use thiserror::Error;

/// Why a [`Config`](super::Config) could not be loaded or failed validation.
///
/// Loading from the environment yields [`EnvVar`](ConfigError::EnvVar) and
/// [`Parse`](ConfigError::Parse). Every `validate()` yields
/// [`Validation`](ConfigError::Validation), and so does model initialization.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A value breaks a rule, e.g. `n_embd` not divisible by `n_head`.
    #[error("config validation: {0}")]
    Validation(String),

    /// The variable is set but unreadable (not Unicode).
    #[error("env var {key}: {message}")]
    EnvVar { key: String, message: String },

    /// The variable is set but does not parse as the field's type, e.g. `MICROGPT_SEED=abc`.
    #[error("env var {key}={value:?}: {message}")]
    Parse {
        key: String,
        /// Raw text of the variable.
        value: String,
        message: String,
    },
}

impl ConfigError {
    /// The failed rule or parse reason, without the key.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ConfigError::Validation(m) => m,
            ConfigError::EnvVar { message, .. } | ConfigError::Parse { message, .. } => message,
        }
    }
}
