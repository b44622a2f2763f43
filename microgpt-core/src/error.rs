//! Crate-level error type wrapping every module's errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::data::DataError;
use crate::model::ModelError;
use crate::tokenizer::TokenizerError;
use crate::train::TrainError;

/// Any error the library can return.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Train(#[from] TrainError),
}

/// `Result` with the crate [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
