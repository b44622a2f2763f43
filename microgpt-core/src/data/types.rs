//! Types for loaded data: [`DataItem`] (one non-empty document) and [`Data`] (non-empty list of documents).

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use super::DataError;

/// A single non-empty document (e.g. one trimmed line of the corpus).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DataItem(String);

impl DataItem {
    /// Creates a [`DataItem`] from a line (trimmed).
    ///
    /// # Errors
    ///
    /// - [`DataError::EmptyDataItem`] when `line` is empty or only whitespace.
    pub fn new(line: &str) -> Result<Self, DataError> {
        let s = line.trim();
        if s.is_empty() {
            return Err(DataError::EmptyDataItem);
        }
        Ok(DataItem(s.to_string()))
    }

    /// Returns the inner string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DataItem {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Loaded corpus: a non-empty list of [`DataItem`]s.
#[derive(Clone, Debug)]
pub struct Data(Vec<DataItem>);

impl Data {
    /// Builds [`Data`] from a non-empty list of items.
    ///
    /// # Errors
    ///
    /// - [`DataError::EmptyFile`] when `items` is empty.
    pub fn new(items: Vec<DataItem>) -> Result<Self, DataError> {
        if items.is_empty() {
            return Err(DataError::EmptyFile);
        }
        Ok(Data(items))
    }

    /// Parses text with one document per line; lines are trimmed and blank lines skipped.
    ///
    /// # Errors
    ///
    /// - [`DataError::EmptyFile`] when no non-blank line remains.
    pub fn parse(text: &str) -> Result<Self, DataError> {
        let items = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(DataItem::new)
            .collect::<Result<Vec<_>, _>>()?;
        Data::new(items)
    }

    /// Returns the number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no documents (never the case for a constructed [`Data`]).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the documents as a slice.
    #[must_use]
    pub fn items(&self) -> &[DataItem] {
        &self.0
    }

    /// Returns the documents as string slices.
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        self.0.iter().map(DataItem::as_str).collect()
    }

    /// Shuffles the documents in place.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.0.shuffle(rng);
    }

    /// Splits off an evaluation set of `max(1, round(len * eval_fraction))` documents
    /// from the front; the rest is the training set. Returns `(train, eval)`.
    ///
    /// With `eval_fraction == 0` or a single document, the eval set is empty and
    /// everything is kept for training.
    #[must_use]
    pub fn split(&self, eval_fraction: f64) -> (Vec<DataItem>, Vec<DataItem>) {
        if eval_fraction <= 0.0 || self.0.len() < 2 {
            return (self.0.clone(), Vec::new());
        }
        let n_eval = ((self.0.len() as f64 * eval_fraction).round() as usize)
            .max(1)
            .min(self.0.len() - 1);
        let (eval, train) = self.0.split_at(n_eval);
        (train.to_vec(), eval.to_vec())
    }
}
