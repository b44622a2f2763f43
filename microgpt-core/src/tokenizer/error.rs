//! Errors produced when encoding or decoding with a tokenizer.
//!
//! All errors from the tokenizer module use [`TokenizerError`].

use thiserror::Error;

/// Errors produced by the tokenizer module.
///
/// # Variants
///
/// - **UnknownSymbol**: A character was encountered that is not in the alphabet.
///   *When*: During [`encode`](super::Tokenizer::encode) when the input contains a character not seen when the tokenizer was built.
///   *Recovery*: Build the tokenizer from a corpus that includes this character.
///
/// - **InvalidId**: A token id is out of range for the vocabulary.
///   *When*: During [`decode`](super::Tokenizer::decode) when an id is not in `[0, vocab_size)`.
///   *Recovery*: Ensure the ids were produced by this tokenizer or by a model with the same vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizerError {
    /// A character not in the alphabet was encountered during encode.
    #[error("tokenizer: unknown symbol {0:?}")]
    UnknownSymbol(char),

    /// A token id is out of range during decode.
    #[error("tokenizer: invalid id {0}")]
    InvalidId(usize),
}
