//! The transformer: parameters, forward pass, loss, sampling and checkpoints.
//!
//! A [`StateDict`] owns the [`Graph`](crate::autograd::Graph) its parameters live in.
//! [`gpt`] processes one position against a [`KvCache`]; [`forward`] turns a token
//! sequence into a scalar loss node; [`InferenceStepwise`] samples from the model one
//! position at a time. [`NumericStateDict`] and [`Checkpoint`] move weights across
//! threads and files without any graph attached.

mod cache;
mod error;
mod gpt;
mod inference;
mod snapshot;
mod state_dict;

pub use cache::KvCache;
pub use error::ModelError;
pub use gpt::{forward, gpt};
pub use inference::{generate, sample_text, InferenceStep, InferenceStepwise};
pub use snapshot::{Checkpoint, NumericStateDict};
pub use state_dict::{StateDict, Weights};
