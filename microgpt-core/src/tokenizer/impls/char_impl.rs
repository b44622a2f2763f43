//! Character-level tokenizer: one token per character plus a reserved BOS id.

use super::super::Vocab;
use super::super::{Tokenizer, TokenizerError};

/// Character-level tokenizer.
///
/// Ids `0..alphabet_len` are the sorted characters of the training corpus; the
/// last id (`vocab_size - 1`) is the BOS token that both starts and ends every
/// encoded document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharTokenizer {
    vocab: Vocab,
}

impl CharTokenizer {
    /// Builds a tokenizer from the documents it will encode.
    #[must_use]
    pub fn from_docs<S: AsRef<str>>(docs: &[S]) -> Self {
        CharTokenizer {
            vocab: Vocab::from_docs(docs),
        }
    }

    /// Rebuilds a tokenizer from a saved alphabet (see [`CharTokenizer::chars`]).
    #[must_use]
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        CharTokenizer {
            vocab: Vocab::from_chars(chars),
        }
    }

    /// The alphabet in id order (BOS excluded).
    #[must_use]
    pub fn chars(&self) -> &[char] {
        self.vocab.chars()
    }
}

impl Tokenizer for CharTokenizer {
    fn encode(&self, s: &str) -> Result<Vec<usize>, TokenizerError> {
        let bos = self.bos_id();
        let mut ids = Vec::with_capacity(s.chars().count() + 2);
        ids.push(bos);
        for ch in s.chars() {
            let id = self
                .vocab
                .get_id(ch)
                .ok_or(TokenizerError::UnknownSymbol(ch))?;
            ids.push(id);
        }
        ids.push(bos);
        Ok(ids)
    }

    fn decode(&self, ids: &[usize]) -> Result<String, TokenizerError> {
        let bos = self.bos_id();
        let mut s = String::with_capacity(ids.len());
        for &id in ids {
            if id == bos {
                continue;
            }
            let ch = self
                .vocab
                .get_char(id)
                .ok_or(TokenizerError::InvalidId(id))?;
            s.push(ch);
        }
        Ok(s)
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len() + 1
    }

    fn bos_id(&self) -> usize {
        self.vocab.len()
    }
}
