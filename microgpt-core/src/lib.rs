//! # microgpt-core
//!
//! A character-level GPT built out of individual scalars: a reverse-mode autograd
//! arena, the transformer forward pass on top of it, and the Adam/SGD training loop
//! that drives both. Corpus loading, tokenization and configuration live alongside
//! for a runnable pipeline.
//!
//! ```
//! use microgpt_core::config::ModelConfig;
//! use microgpt_core::model::{generate, StateDict};
//! use microgpt_core::train::{train_step, Sgd};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let config = ModelConfig { n_embd: 4, n_head: 1, n_layer: 1, block_size: 4, init_std: 0.1 };
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut state = StateDict::init(3, &config, &mut rng)?;
//! let mut sgd = Sgd::new(0.1);
//! let info = train_step(&mut state, &mut sgd, &[2, 0, 1, 2], 0, 1);
//! assert!(info.loss.is_finite());
//! let tokens = generate(&mut state, 0.0, &[], &mut rng)?;
//! assert!(tokens.len() <= 4);
//! # Ok::<(), microgpt_core::Error>(())
//! ```

pub mod autograd;
pub mod config;
pub mod data;
mod error;
pub mod linalg;
pub mod model;
pub mod tokenizer;
pub mod train;

pub use error::{Error, Result};
