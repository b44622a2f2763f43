//! Autoregressive sampling, one position at a time.

use std::iter::FusedIterator;

use rand::Rng;
use rand_distr::weighted::WeightedIndex;
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{gpt, KvCache, ModelError, StateDict};
use crate::autograd::Mark;
use crate::linalg::softmax;
use crate::tokenizer::Tokenizer;

/// One generated position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InferenceStep {
    /// Position the token was sampled for.
    pub pos_id: usize,
    /// Next-token distribution after temperature scaling, one entry per vocabulary id.
    pub probs: Vec<f64>,
    /// The sampled (or arg-max) token.
    pub token_id: usize,
    /// Prompt and previously generated tokens, BOS excluded; does not include `token_id`.
    pub prev_tokens: Vec<usize>,
}

/// Lazy generator of [`InferenceStep`]s.
///
/// The prompt is fed through the model on construction (BOS first, then each
/// prompt token), building the key/value cache without sampling. Each call to
/// [`next`](Iterator::next) then samples one token. The sequence ends after a BOS
/// token is sampled or when the context window is full.
///
/// With `temperature == 0` the arg-max token is taken (first one on ties);
/// otherwise logits are divided by the temperature and a token is drawn from the
/// resulting distribution.
///
/// The generator borrows the model exclusively. Nodes it adds to the model's graph
/// are dropped with it.
pub struct InferenceStepwise<'a, R> {
    state: &'a mut StateDict,
    rng: R,
    temperature: f64,
    cache: KvCache,
    mark: Mark,
    bos_id: usize,
    token_id: usize,
    pos_id: usize,
    tokens: Vec<usize>,
    done: bool,
}

impl<'a, R: Rng> InferenceStepwise<'a, R> {
    /// Validates the prompt and feeds it through the model.
    ///
    /// BOS is `state.vocab_size() - 1`. Pass `&mut rng` to keep using a generator afterwards.
    ///
    /// # Errors
    ///
    /// - [`ModelError::InvalidTemperature`] when `temperature` is negative or not finite.
    /// - [`ModelError::PrefixTooLong`] when `prefix` does not fit in `block_size`.
    /// - [`ModelError::InvalidToken`] when a prompt id is outside the vocabulary.
    pub fn new(
        state: &'a mut StateDict,
        temperature: f64,
        prefix: &[usize],
        rng: R,
    ) -> Result<Self, ModelError> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(ModelError::InvalidTemperature(temperature));
        }
        let block_size = state.config().block_size;
        if prefix.len() > block_size {
            return Err(ModelError::PrefixTooLong {
                len: prefix.len(),
                block_size,
            });
        }
        let vocab_size = state.vocab_size();
        if let Some(&token) = prefix.iter().find(|&&t| t >= vocab_size) {
            return Err(ModelError::InvalidToken { token, vocab_size });
        }

        let bos_id = vocab_size - 1;
        let mark = state.graph().mark();
        let mut cache = KvCache::new(state.config().n_layer);
        let mut token_id = bos_id;
        for (pos_id, &next) in prefix.iter().enumerate() {
            let _ = gpt(state, token_id, pos_id, &mut cache);
            token_id = next;
        }

        Ok(InferenceStepwise {
            state,
            rng,
            temperature,
            cache,
            mark,
            bos_id,
            token_id,
            pos_id: prefix.len(),
            tokens: prefix.to_vec(),
            done: false,
        })
    }

    /// Prompt followed by every non-BOS token generated so far.
    #[must_use]
    pub fn tokens(&self) -> &[usize] {
        &self.tokens
    }

    /// Key/value history of the positions processed so far.
    #[must_use]
    pub fn cache(&self) -> &KvCache {
        &self.cache
    }

    fn pick(&mut self, probs: &[f64]) -> usize {
        if self.temperature == 0.0 {
            return argmax(probs);
        }
        WeightedIndex::new(probs)
            .map(|dist| dist.sample(&mut self.rng))
            .unwrap_or(self.bos_id)
    }
}

/// Index of the largest entry; the first one wins ties.
fn argmax(xs: &[f64]) -> usize {
    xs.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &x)| if x > best.1 { (i, x) } else { best })
        .0
}

impl<R: Rng> Iterator for InferenceStepwise<'_, R> {
    type Item = InferenceStep;

    fn next(&mut self) -> Option<InferenceStep> {
        if self.done || self.pos_id >= self.state.config().block_size {
            return None;
        }
        let logits = gpt(self.state, self.token_id, self.pos_id, &mut self.cache);
        let g = self.state.graph_mut();
        let scaled = if self.temperature == 0.0 {
            logits
        } else {
            logits.iter().map(|&l| g.div(l, self.temperature)).collect()
        };
        let probs: Vec<f64> = softmax(g, &scaled).iter().map(|&p| g.data(p)).collect();

        let token_id = self.pick(&probs);
        trace!(pos_id = self.pos_id, token_id, "sampled token");
        let step = InferenceStep {
            pos_id: self.pos_id,
            probs,
            token_id,
            prev_tokens: self.tokens.clone(),
        };

        if token_id == self.bos_id {
            self.done = true;
        } else {
            self.tokens.push(token_id);
            self.token_id = token_id;
        }
        self.pos_id += 1;
        Some(step)
    }
}

impl<R: Rng> FusedIterator for InferenceStepwise<'_, R> {}

impl<R> Drop for InferenceStepwise<'_, R> {
    fn drop(&mut self) {
        self.state.graph_mut().rewind(self.mark);
    }
}

/// Runs a generator to completion and returns the prompt followed by the generated
/// tokens (the terminating BOS excluded).
///
/// # Errors
///
/// Any validation error of [`InferenceStepwise::new`].
pub fn generate<R: Rng>(
    state: &mut StateDict,
    temperature: f64,
    prefix: &[usize],
    rng: R,
) -> Result<Vec<usize>, ModelError> {
    let mut steps = InferenceStepwise::new(state, temperature, prefix, rng)?;
    for _ in steps.by_ref() {}
    Ok(steps.tokens().to_vec())
}

/// Generates a completion of `prompt` and decodes it (prompt included).
///
/// # Errors
///
/// [`crate::Error::Tokenizer`] when the prompt has unknown characters, otherwise any
/// error of [`generate`].
pub fn sample_text<T, R>(
    state: &mut StateDict,
    tokenizer: &T,
    temperature: f64,
    prompt: &str,
    rng: R,
) -> crate::Result<String>
where
    T: Tokenizer + ?Sized,
    R: Rng,
{
    let encoded = tokenizer.encode(prompt)?;
    let prefix = &encoded[1..encoded.len() - 1];
    let tokens = generate(state, temperature, prefix, rng)?;
    Ok(tokenizer.decode(&tokens)?)
}
