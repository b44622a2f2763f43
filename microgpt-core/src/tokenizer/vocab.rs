//! Alphabet: mapping between dense token ids and characters.

use std::collections::{BTreeSet, HashMap};

/// Sorted, deduplicated character alphabet. Ids are contiguous from `0` to `len - 1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocab {
    id_to_char: Vec<char>,
    char_to_id: HashMap<char, usize>,
}

impl Vocab {
    /// Builds the alphabet of every character appearing in `docs`, in sorted order.
    #[must_use]
    pub fn from_docs<S: AsRef<str>>(docs: &[S]) -> Self {
        let unique: BTreeSet<char> = docs.iter().flat_map(|d| d.as_ref().chars()).collect();
        Self::from_chars(unique)
    }

    /// Builds an alphabet from characters; they are sorted and deduplicated.
    #[must_use]
    pub fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        let id_to_char: Vec<char> = chars
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let char_to_id = id_to_char.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Vocab {
            id_to_char,
            char_to_id,
        }
    }

    /// Number of characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_char.len()
    }

    /// Returns `true` if the alphabet is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_char.is_empty()
    }

    /// Returns the character for `id`, or `None` if out of range.
    #[must_use]
    pub fn get_char(&self, id: usize) -> Option<char> {
        self.id_to_char.get(id).copied()
    }

    /// Returns the id for `ch`, or `None` if not in the alphabet.
    #[must_use]
    pub fn get_id(&self, ch: char) -> Option<usize> {
        self.char_to_id.get(&ch).copied()
    }

    /// The alphabet in id order.
    #[must_use]
    pub fn chars(&self) -> &[char] {
        &self.id_to_char
    }
}
