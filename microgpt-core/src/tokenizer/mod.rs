//! Tokenization: encode documents to token ids and decode back.
//!
//! This module defines the **trait** ([`Tokenizer`]) and **error** ([`TokenizerError`]).
//! Implementations live in the `impls` submodule ([`CharTokenizer`] for character-level).
//!
//! Every encoded document starts and ends with the reserved BOS id, which is
//! always `vocab_size - 1`; the model relies on this to prime and stop generation.

mod error;
mod impls;
mod vocab;

pub use error::TokenizerError;
pub use impls::CharTokenizer;
pub use vocab::Vocab;

/// Trait for tokenizers: encode text to ids and decode ids to text.
pub trait Tokenizer {
    /// Encodes a document as `[BOS, ids..., BOS]`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizerError::UnknownSymbol`] if a character is not in the vocabulary.
    fn encode(&self, s: &str) -> Result<Vec<usize>, TokenizerError>;

    /// Decodes token ids into a string, dropping BOS tokens.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizerError::InvalidId`] if an id is out of range.
    fn decode(&self, ids: &[usize]) -> Result<String, TokenizerError>;

    /// Vocabulary size (alphabet plus BOS).
    fn vocab_size(&self) -> usize;

    /// Token id used for beginning and end of sequence.
    fn bos_id(&self) -> usize;

    /// Encodes every document.
    ///
    /// # Errors
    ///
    /// Stops at the first document containing an unknown character.
    fn encode_all<S: AsRef<str>>(&self, docs: &[S]) -> Result<Vec<Vec<usize>>, TokenizerError>
    where
        Self: Sized,
    {
        docs.iter().map(|d| self.encode(d.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocab_is_sorted_and_bos_is_last() {
        let t = CharTokenizer::from_docs(&["cab", "bca"]);
        assert_eq!(t.chars(), &['a', 'b', 'c']);
        assert_eq!(t.vocab_size(), 4, "a, b, c + BOS");
        assert_eq!(t.bos_id(), t.vocab_size() - 1);
    }

    #[test]
    fn encode_wraps_with_bos() {
        let t = CharTokenizer::from_docs(&["ab"]);
        assert_eq!(t.encode("ab").unwrap(), vec![2, 0, 1, 2]);
        assert_eq!(t.encode("").unwrap(), vec![2, 2]);
    }

    #[test]
    fn decode_of_encode_round_trips() {
        let docs = ["emma", "olivia", "ava", "zoë"];
        let t = CharTokenizer::from_docs(&docs);
        for doc in docs {
            let ids = t.encode(doc).unwrap();
            assert_eq!(t.decode(&ids).unwrap(), doc);
        }
    }

    #[test]
    fn unknown_char_returns_error() {
        let t = CharTokenizer::from_docs(&["ab"]);
        assert_eq!(t.encode("abc"), Err(TokenizerError::UnknownSymbol('c')));
    }

    #[test]
    fn decode_invalid_id_returns_error() {
        let t = CharTokenizer::from_docs(&["a"]);
        assert_eq!(t.decode(&[0, 100]), Err(TokenizerError::InvalidId(100)));
    }

    #[test]
    fn from_chars_rebuilds_the_same_tokenizer() {
        let t = CharTokenizer::from_docs(&["hello", "world"]);
        let rebuilt = CharTokenizer::from_chars(t.chars().iter().copied());
        assert_eq!(rebuilt, t);
    }

    #[test]
    fn encode_all_encodes_every_doc() {
        let t = CharTokenizer::from_docs(&["ab", "b"]);
        let encoded = t.encode_all(&["ab", "b"]).unwrap();
        assert_eq!(encoded, vec![vec![2, 0, 1, 2], vec![2, 1, 2]]);
        assert!(t.encode_all(&["x"]).is_err());
    }

    #[test]
    fn vocab_lookup() {
        let v = Vocab::from_chars("bba".chars());
        assert_eq!(v.len(), 2);
        assert!(!v.is_empty());
        assert_eq!(v.get_id('b'), Some(1));
        assert_eq!(v.get_char(0), Some('a'));
        assert_eq!(v.get_char(2), None);
    }
}
