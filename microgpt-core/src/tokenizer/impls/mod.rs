//! Implementations of [`Tokenizer`](super::super::Tokenizer).

mod char_impl;

pub use char_impl::CharTokenizer;
