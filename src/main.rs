//! # MicroGPT (Rust)
//!
//! Train a character-level GPT on a file of documents (one per line), save it, and
//! print a few samples.
//!
//! Settings come from `MICROGPT_*` environment variables (see
//! [`microgpt_core::config::from_env`]); log verbosity from `RUST_LOG`.
//!
//! Pipeline: Dataset → Tokenizer → Model init → Training loop → Checkpoint → Inference.

use std::ops::ControlFlow;

use anyhow::{Context, Result};
use microgpt_core::config::{self, Config};
use microgpt_core::data::{load_from_path, DataItem};
use microgpt_core::model::{sample_text, Checkpoint, StateDict};
use microgpt_core::tokenizer::{CharTokenizer, Tokenizer};
use microgpt_core::train::{train, Adam, TrainEvent, TrainOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn encode(tokenizer: &CharTokenizer, docs: &[DataItem]) -> Result<Vec<Vec<usize>>> {
    Ok(tokenizer.encode_all(docs)?)
}

fn main() -> Result<()> {
    init_tracing();

    let cfg: Config = config::from_env().context("reading configuration")?;
    cfg.validate().context("validating configuration")?;
    let mut rng = StdRng::seed_from_u64(cfg.seed);

    // ----- Dataset: one document per line, shuffled, split into train / eval -----
    let mut data = load_from_path(&cfg.input_path)
        .with_context(|| format!("loading {}", cfg.input_path.display()))?;
    data.shuffle(&mut rng);
    let (train_docs, eval_docs) = data.split(cfg.eval_fraction);
    info!(
        num_docs = data.len(),
        num_train = train_docs.len(),
        num_eval = eval_docs.len(),
        "loaded dataset"
    );

    // ----- Tokenizer: unique chars → token ids; BOS = vocab_size - 1 -----
    let tokenizer = CharTokenizer::from_docs(data.items());
    info!(vocab_size = tokenizer.vocab_size(), "built tokenizer");
    let train_tokens = encode(&tokenizer, &train_docs)?;
    let eval_tokens = encode(&tokenizer, &eval_docs)?;

    // ----- Parameters and optimizer -----
    let mut state = StateDict::init(tokenizer.vocab_size(), &cfg.model, &mut rng)?;
    let mut adam = Adam::new(cfg.adam, state.num_params())?;

    // ----- Training loop -----
    let options = TrainOptions {
        num_steps: cfg.num_steps,
        eval_docs: &eval_tokens,
        abort: None,
    };
    let log_every = cfg.loss_log_every;
    train(&mut state, &mut adam, &train_tokens, &options, |event| {
        if let TrainEvent::Step(s) = event {
            if s.step == 0 || (s.step + 1) % log_every == 0 {
                info!(
                    "step {:4} / {:4} | loss {:.4} | smooth {:.4} | lr {:.5}",
                    s.step + 1,
                    s.num_steps,
                    s.loss,
                    s.smooth_loss,
                    s.lr
                );
            }
        }
        ControlFlow::Continue(())
    })?;

    // ----- Checkpoint -----
    Checkpoint::new(&state, &tokenizer)
        .save(&cfg.checkpoint_path)
        .with_context(|| format!("saving {}", cfg.checkpoint_path.display()))?;

    // ----- Inference: start from BOS; sample until BOS or block size -----
    println!("\n--- inference (new, hallucinated names) ---");
    for sample_idx in 0..cfg.sample_size {
        let text = sample_text(&mut state, &tokenizer, cfg.temperature, "", &mut rng)?;
        println!("sample {:2}: {}", sample_idx + 1, text);
    }

    Ok(())
}
