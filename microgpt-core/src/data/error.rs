//! Errors produced when loading or validating input data.

use thiserror::Error;

/// Errors produced by the data loading module.
///
/// # Variants
///
/// - **Io**: Failed to read the file (e.g. file not found, permission denied, invalid UTF-8).
///   *When*: Opening or reading the path in [`PathLoader`](super::PathLoader) or [`load_from_path`](super::load_from_path).
///   *Recovery*: Ensure the path exists, is readable, and contains valid UTF-8.
///
/// - **EmptyFile**: The input yields no documents (no lines, or all lines blank).
///   *When*: Building [`Data`](super::Data) from text or from an empty list of items.
///   *Recovery*: Provide input with at least one non-blank line.
///
/// - **EmptyDataItem**: A document was empty after trimming.
///   *When*: Building a [`DataItem`](super::DataItem) directly from a blank string.
///   *Recovery*: Skip blank lines before constructing items.
#[derive(Debug, Error)]
pub enum DataError {
    /// I/O error while reading the input file.
    #[error("data io: {0}")]
    Io(#[from] std::io::Error),

    /// The input is empty or yields no non-blank lines.
    #[error("data: input is empty")]
    EmptyFile,

    /// A document was empty after trimming.
    #[error("data: empty document")]
    EmptyDataItem,
}
