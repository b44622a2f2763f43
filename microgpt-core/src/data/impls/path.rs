//! [`DataLoader`](super::super::DataLoader) implementation that reads from a file path (UTF-8, one document per line).

use std::fs;
use std::path::Path;

use super::super::{Data, DataError, DataLoader};

/// Loads documents from a file path: one per line, trimmed, blank lines skipped.
#[derive(Clone, Debug)]
pub struct PathLoader<P>(pub P);

impl<P> PathLoader<P>
where
    P: AsRef<Path>,
{
    /// Creates a loader for the given path.
    #[must_use]
    pub fn new(path: P) -> Self {
        PathLoader(path)
    }
}

impl<P> DataLoader for PathLoader<P>
where
    P: AsRef<Path>,
{
    fn load(&self) -> Result<Data, DataError> {
        let content = fs::read_to_string(self.0.as_ref())?;
        Data::parse(&content)
    }
}

/// Convenience: load data from a path using [`PathLoader`].
///
/// # Errors
///
/// - [`DataError::Io`] when the path cannot be read or content is not valid UTF-8.
/// - [`DataError::EmptyFile`] when the file yields no non-blank lines.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Data, DataError> {
    PathLoader::new(path).load()
}
