//! Input data loading (corpus documents, one per line).
//!
//! This module defines the **trait** ([`DataLoader`]), **models** ([`DataItem`], [`Data`]), and **error** ([`DataError`]).
//! Implementations (e.g. [`PathLoader`] for file paths) are in the `impls` submodule.

mod error;
mod impls;
mod types;

pub use error::DataError;
pub use impls::{load_from_path, PathLoader};
pub use types::{Data, DataItem};

/// Trait for loading input data.
pub trait DataLoader {
    /// Loads data. Returns [`Data`] or a [`DataError`].
    fn load(&self) -> Result<Data, DataError>;
}
