//! Plain-number copies of a model, for threads, files and evaluation.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::state_dict::{tensor_shape, LAYER_TENSORS};
use super::{ModelError, StateDict};
use crate::config::ModelConfig;
use crate::linalg::Matrix;
use crate::tokenizer::CharTokenizer;

/// Every tensor of a [`StateDict`] as nested `f64` arrays, with no graph attached.
///
/// Field names and nesting match [`Weights`](super::Weights).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericStateDict {
    pub wte: Vec<Vec<f64>>,
    pub wpe: Vec<Vec<f64>>,
    pub attn_wq: Vec<Vec<Vec<f64>>>,
    pub attn_wk: Vec<Vec<Vec<f64>>>,
    pub attn_wv: Vec<Vec<Vec<f64>>>,
    pub attn_wo: Vec<Vec<Vec<f64>>>,
    pub mlp_fc1: Vec<Vec<Vec<f64>>>,
    pub mlp_fc2: Vec<Vec<Vec<f64>>>,
    pub lm_head: Vec<Vec<f64>>,
}

impl NumericStateDict {
    pub(crate) fn from_state(state: &StateDict) -> Self {
        let g = state.graph();
        let numeric = |m: &Matrix| -> Vec<Vec<f64>> {
            m.iter()
                .map(|row| row.iter().map(|&v| g.data(v)).collect())
                .collect()
        };
        let layers = |ms: &[Matrix]| -> Vec<Vec<Vec<f64>>> { ms.iter().map(numeric).collect() };
        let w = state.weights();
        NumericStateDict {
            wte: numeric(&w.wte),
            wpe: numeric(&w.wpe),
            attn_wq: layers(&w.attn_wq),
            attn_wk: layers(&w.attn_wk),
            attn_wv: layers(&w.attn_wv),
            attn_wo: layers(&w.attn_wo),
            mlp_fc1: layers(&w.mlp_fc1),
            mlp_fc2: layers(&w.mlp_fc2),
            lm_head: numeric(&w.lm_head),
        }
    }

    fn layer(&self, name: &str) -> &[Vec<Vec<f64>>] {
        match name {
            "attn_wq" => &self.attn_wq,
            "attn_wk" => &self.attn_wk,
            "attn_wv" => &self.attn_wv,
            "attn_wo" => &self.attn_wo,
            "mlp_fc1" => &self.mlp_fc1,
            "mlp_fc2" => &self.mlp_fc2,
            other => unreachable!("no per-layer tensor named {other}"),
        }
    }

    /// Value at `[layer][row][col]` of tensor `name`. Shapes must have been checked.
    pub(crate) fn value(&self, name: &str, layer: usize, row: usize, col: usize) -> f64 {
        match name {
            "wte" => self.wte[row][col],
            "wpe" => self.wpe[row][col],
            "lm_head" => self.lm_head[row][col],
            other => self.layer(other)[layer][row][col],
        }
    }

    /// Checks every tensor against the shapes `config` and `vocab_size` imply.
    ///
    /// # Errors
    ///
    /// [`ModelError::Shape`] for the first mismatching matrix, [`ModelError::LayerCount`]
    /// when a per-layer tensor has the wrong number of layers.
    pub fn check_shapes(&self, vocab_size: usize, config: &ModelConfig) -> Result<(), ModelError> {
        check_matrix("wte", &self.wte, vocab_size, config)?;
        check_matrix("wpe", &self.wpe, vocab_size, config)?;
        for name in LAYER_TENSORS {
            let layers = self.layer(name);
            if layers.len() != config.n_layer {
                return Err(ModelError::LayerCount {
                    name,
                    expected: config.n_layer,
                    actual: layers.len(),
                });
            }
            for m in layers {
                check_matrix(name, m, vocab_size, config)?;
            }
        }
        check_matrix("lm_head", &self.lm_head, vocab_size, config)
    }

    /// Total number of scalars.
    #[must_use]
    pub fn num_params(&self) -> usize {
        let count = |m: &Vec<Vec<f64>>| m.iter().map(Vec::len).sum::<usize>();
        let layers = LAYER_TENSORS
            .iter()
            .flat_map(|name| self.layer(name))
            .map(count)
            .sum::<usize>();
        count(&self.wte) + count(&self.wpe) + layers + count(&self.lm_head)
    }
}

fn check_matrix(
    name: &str,
    m: &[Vec<f64>],
    vocab_size: usize,
    config: &ModelConfig,
) -> Result<(), ModelError> {
    let (expected_rows, expected_cols) = tensor_shape(name, vocab_size, config);
    let bad_row = m.iter().find(|row| row.len() != expected_cols);
    if m.len() != expected_rows || bad_row.is_some() {
        return Err(ModelError::Shape {
            name: name.to_string(),
            expected_rows,
            expected_cols,
            rows: m.len(),
            cols: bad_row.or(m.first()).map_or(0, Vec::len),
        });
    }
    Ok(())
}

/// A trained model on disk: dimensions, tokenizer alphabet and weights, stored as JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub config: ModelConfig,
    /// Tokenizer alphabet in id order; BOS is implied as the last id.
    pub chars: Vec<char>,
    pub weights: NumericStateDict,
}

impl Checkpoint {
    #[must_use]
    pub fn new(state: &StateDict, tokenizer: &CharTokenizer) -> Self {
        Checkpoint {
            config: *state.config(),
            chars: tokenizer.chars().to_vec(),
            weights: state.snapshot(),
        }
    }

    /// Writes the checkpoint as JSON, replacing any existing file.
    ///
    /// # Errors
    ///
    /// [`ModelError::Io`] or [`ModelError::Json`] when the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        info!(path = %path.display(), num_params = self.weights.num_params(), "saved checkpoint");
        Ok(())
    }

    /// Reads a checkpoint written by [`Checkpoint::save`].
    ///
    /// # Errors
    ///
    /// [`ModelError::Io`] or [`ModelError::Json`] when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let checkpoint: Checkpoint = serde_json::from_str(&json)?;
        info!(path = %path.display(), "loaded checkpoint");
        Ok(checkpoint)
    }

    #[must_use]
    pub fn tokenizer(&self) -> CharTokenizer {
        CharTokenizer::from_chars(self.chars.iter().copied())
    }

    /// Rebuilds the model.
    ///
    /// # Errors
    ///
    /// Any [`ModelError`] from [`StateDict::from_numeric`], or [`ModelError::Shape`] when the
    /// embeddings do not match the alphabet size.
    pub fn state_dict(&self) -> Result<StateDict, ModelError> {
        self.weights.check_shapes(self.chars.len() + 1, &self.config)?;
        StateDict::from_numeric(&self.config, &self.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> ModelConfig {
        ModelConfig {
            n_embd: 4,
            n_head: 2,
            n_layer: 2,
            block_size: 3,
            init_std: 0.1,
        }
    }

    #[test]
    fn snapshot_has_every_param() {
        let state = StateDict::init(5, &config(), &mut StdRng::seed_from_u64(1)).unwrap();
        let snap = state.snapshot();
        assert_eq!(snap.num_params(), state.num_params());
        assert_eq!(snap.wte[2][3], state.graph().data(state.weights().wte[2][3]));
        assert_eq!(
            snap.mlp_fc2[1][0][7],
            state.graph().data(state.weights().mlp_fc2[1][0][7])
        );
    }

    #[test]
    fn restore_round_trips_values_and_resets_gradients() {
        let mut state = StateDict::init(5, &config(), &mut StdRng::seed_from_u64(1)).unwrap();
        let before = state.snapshot();

        let (g, params) = state.graph_and_params();
        let params = params.to_vec();
        for &p in &params {
            g.set_data(p, 0.5);
        }
        let y = g.mul(params[0], 3.0);
        g.backward(y);
        assert_ne!(state.snapshot(), before);

        state.restore(&before).unwrap();
        assert_eq!(state.snapshot(), before);
        assert_eq!(state.graph().len(), state.num_params());
        assert!(state.params().iter().all(|&p| state.graph().grad(p) == 0.0));
    }

    #[test]
    fn restore_rejects_wrong_shapes() {
        let mut state = StateDict::init(5, &config(), &mut StdRng::seed_from_u64(1)).unwrap();
        let good = state.snapshot();

        let mut bad = good.clone();
        bad.wpe.pop();
        assert!(matches!(
            state.restore(&bad),
            Err(ModelError::Shape { ref name, rows: 2, .. }) if name == "wpe"
        ));

        let mut bad = good.clone();
        bad.attn_wk.pop();
        assert!(matches!(
            state.restore(&bad),
            Err(ModelError::LayerCount { name: "attn_wk", expected: 2, actual: 1 })
        ));

        let mut bad = good.clone();
        bad.mlp_fc1[0][3].push(0.0);
        assert!(matches!(
            state.restore(&bad),
            Err(ModelError::Shape { cols: 5, .. })
        ));

        assert_eq!(state.snapshot(), good);
    }

    #[test]
    fn checkpoint_save_and_load() {
        let tokenizer = CharTokenizer::from_docs(&["abcd"]);
        let state = StateDict::init(5, &config(), &mut StdRng::seed_from_u64(4)).unwrap();
        let checkpoint = Checkpoint::new(&state, &tokenizer);

        let path = std::env::temp_dir().join("microgpt_checkpoint_test.json");
        checkpoint.save(&path).unwrap();
        let loaded = Checkpoint::load(&path);
        let _ = std::fs::remove_file(&path);
        let loaded = loaded.unwrap();

        assert_eq!(loaded, checkpoint);
        assert_eq!(loaded.tokenizer(), tokenizer);
        let rebuilt = loaded.state_dict().unwrap();
        assert_eq!(rebuilt.snapshot(), state.snapshot());
        assert_eq!(rebuilt.config(), state.config());
    }

    #[test]
    fn checkpoint_alphabet_must_match_embeddings() {
        let tokenizer = CharTokenizer::from_docs(&["ab"]);
        let state = StateDict::init(5, &config(), &mut StdRng::seed_from_u64(4)).unwrap();
        let checkpoint = Checkpoint::new(&state, &tokenizer);
        assert!(matches!(
            checkpoint.state_dict(),
            Err(ModelError::Shape { ref name, .. }) if name == "wte"
        ));
    }

    #[test]
    fn load_missing_checkpoint_is_io_error() {
        let result = Checkpoint::load("/nonexistent/microgpt_missing.json");
        assert!(matches!(result, Err(ModelError::Io(_))));
    }
}
