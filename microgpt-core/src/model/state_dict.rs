//! Model parameters: the graph that owns them and their per-tensor layout.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::info;

use super::snapshot::NumericStateDict;
use super::ModelError;
use crate::autograd::{Graph, Mark, Value};
use crate::config::ModelConfig;
use crate::linalg::Matrix;

/// Parameter matrices of the transformer, as handles into the owning [`StateDict`]'s graph.
///
/// Per-layer tensors are indexed by layer first (`attn_wq[layer][out][in]`).
#[derive(Clone, Debug)]
pub struct Weights {
    /// Token embedding, `vocab_size x n_embd`.
    pub wte: Matrix,
    /// Position embedding, `block_size x n_embd`.
    pub wpe: Matrix,
    pub attn_wq: Vec<Matrix>,
    pub attn_wk: Vec<Matrix>,
    pub attn_wv: Vec<Matrix>,
    pub attn_wo: Vec<Matrix>,
    /// MLP expansion, `mlp_dim x n_embd`.
    pub mlp_fc1: Vec<Matrix>,
    /// MLP projection, `n_embd x mlp_dim`.
    pub mlp_fc2: Vec<Matrix>,
    /// Language-model head, `vocab_size x n_embd`.
    pub lm_head: Matrix,
}

/// Names of the per-layer tensors, in parameter order.
pub(crate) const LAYER_TENSORS: [&str; 6] = [
    "attn_wq", "attn_wk", "attn_wv", "attn_wo", "mlp_fc1", "mlp_fc2",
];

/// `(rows, cols)` of the tensor called `name`.
pub(crate) fn tensor_shape(
    name: &str,
    vocab_size: usize,
    config: &ModelConfig,
) -> (usize, usize) {
    match name {
        "wte" | "lm_head" => (vocab_size, config.n_embd),
        "wpe" => (config.block_size, config.n_embd),
        "mlp_fc1" => (config.mlp_dim(), config.n_embd),
        "mlp_fc2" => (config.n_embd, config.mlp_dim()),
        _ => (config.n_embd, config.n_embd),
    }
}

impl Weights {
    /// Allocates every tensor as leaves of `g`, in parameter order.
    ///
    /// `init(name, layer, row, col)` supplies each initial value; `layer` is 0 for
    /// tensors that are not per-layer.
    fn build<F>(g: &mut Graph, vocab_size: usize, config: &ModelConfig, mut init: F) -> Self
    where
        F: FnMut(&str, usize, usize, usize) -> f64,
    {
        let mut matrix = |g: &mut Graph, name: &str, layer: usize| -> Matrix {
            let (rows, cols) = tensor_shape(name, vocab_size, config);
            (0..rows)
                .map(|r| (0..cols).map(|c| g.leaf(init(name, layer, r, c))).collect())
                .collect()
        };

        let wte = matrix(g, "wte", 0);
        let wpe = matrix(g, "wpe", 0);
        let mut per_layer = LAYER_TENSORS.map(|name| {
            (0..config.n_layer)
                .map(|layer| matrix(g, name, layer))
                .collect::<Vec<_>>()
        });
        let lm_head = matrix(g, "lm_head", 0);

        Weights {
            wte,
            wpe,
            attn_wq: std::mem::take(&mut per_layer[0]),
            attn_wk: std::mem::take(&mut per_layer[1]),
            attn_wv: std::mem::take(&mut per_layer[2]),
            attn_wo: std::mem::take(&mut per_layer[3]),
            mlp_fc1: std::mem::take(&mut per_layer[4]),
            mlp_fc2: std::mem::take(&mut per_layer[5]),
            lm_head,
        }
    }

    /// Per-layer tensors in parameter order, paired with their names.
    pub(crate) fn layer_tensors(&self) -> [(&'static str, &[Matrix]); 6] {
        [
            ("attn_wq", self.attn_wq.as_slice()),
            ("attn_wk", self.attn_wk.as_slice()),
            ("attn_wv", self.attn_wv.as_slice()),
            ("attn_wo", self.attn_wo.as_slice()),
            ("mlp_fc1", self.mlp_fc1.as_slice()),
            ("mlp_fc2", self.mlp_fc2.as_slice()),
        ]
    }

    /// Every parameter handle, in the order the optimizer state is indexed by.
    fn flatten(&self) -> Vec<Value> {
        let mut params = Vec::new();
        let mut extend = |m: &Matrix| params.extend(m.iter().flatten().copied());
        extend(&self.wte);
        extend(&self.wpe);
        for (_, layers) in self.layer_tensors() {
            layers.iter().for_each(&mut extend);
        }
        extend(&self.lm_head);
        params
    }
}

/// The trainable state of one model: parameters, their graph, and the shapes they were built with.
///
/// The graph holds the parameters first and any transient forward-pass nodes after
/// them. [`clear_graph`](StateDict::clear_graph) drops the transient part; parameter
/// values and gradients are untouched by it.
#[derive(Clone, Debug)]
pub struct StateDict {
    graph: Graph,
    weights: Weights,
    params: Vec<Value>,
    params_end: Mark,
    config: ModelConfig,
    vocab_size: usize,
}

impl StateDict {
    /// Builds a model with Gaussian(0, `config.init_std`) weights.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Config`] when `config` fails validation.
    /// - [`ModelError::EmptyVocab`] when `vocab_size == 0`.
    pub fn init<R: Rng + ?Sized>(
        vocab_size: usize,
        config: &ModelConfig,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        if vocab_size == 0 {
            return Err(ModelError::EmptyVocab);
        }
        let normal =
            Normal::new(0.0, config.init_std).map_err(|e| ModelError::Init(e.to_string()))?;
        let state = Self::build(vocab_size, config, |_, _, _, _| normal.sample(rng));
        info!(
            vocab_size,
            num_params = state.num_params(),
            n_embd = config.n_embd,
            n_head = config.n_head,
            n_layer = config.n_layer,
            block_size = config.block_size,
            "initialized state dict"
        );
        Ok(state)
    }

    /// Rebuilds a model from plain numbers; every parameter starts with zero gradient.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Config`] when `config` fails validation.
    /// - [`ModelError::EmptyVocab`] when the snapshot has no token embeddings.
    /// - [`ModelError::Shape`] / [`ModelError::LayerCount`] when a tensor does not match `config`.
    pub fn from_numeric(
        config: &ModelConfig,
        numeric: &NumericStateDict,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        let vocab_size = numeric.wte.len();
        if vocab_size == 0 {
            return Err(ModelError::EmptyVocab);
        }
        numeric.check_shapes(vocab_size, config)?;
        Ok(Self::build(vocab_size, config, |name, layer, r, c| {
            numeric.value(name, layer, r, c)
        }))
    }

    fn build<F>(vocab_size: usize, config: &ModelConfig, init: F) -> Self
    where
        F: FnMut(&str, usize, usize, usize) -> f64,
    {
        let mut graph = Graph::new();
        let weights = Weights::build(&mut graph, vocab_size, config, init);
        let params = weights.flatten();
        let params_end = graph.mark();
        StateDict {
            graph,
            weights,
            params,
            params_end,
            config: *config,
            vocab_size,
        }
    }

    /// Plain-number copy of every tensor.
    #[must_use]
    pub fn snapshot(&self) -> NumericStateDict {
        NumericStateDict::from_state(self)
    }

    /// Replaces every parameter with the values in `numeric`.
    ///
    /// The parameter order is unchanged, so optimizer state stays aligned.
    ///
    /// # Errors
    ///
    /// [`ModelError::Shape`] / [`ModelError::LayerCount`] when `numeric` does not match
    /// this model's vocabulary and configuration; `self` is left untouched.
    pub fn restore(&mut self, numeric: &NumericStateDict) -> Result<(), ModelError> {
        numeric.check_shapes(self.vocab_size, &self.config)?;
        *self = Self::from_numeric(&self.config, numeric)?;
        Ok(())
    }

    /// Dimensions this model was built with.
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    #[must_use]
    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Every parameter, in stable order.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    #[must_use]
    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Mutable graph together with the parameter list, for optimizers.
    pub fn graph_and_params(&mut self) -> (&mut Graph, &[Value]) {
        (&mut self.graph, &self.params)
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Graph, &Weights, &ModelConfig) {
        (&mut self.graph, &self.weights, &self.config)
    }

    /// Drops every node created after the parameters.
    pub fn clear_graph(&mut self) {
        self.graph.rewind(self.params_end);
    }

    /// Position just past the last parameter.
    #[must_use]
    pub fn params_end(&self) -> Mark {
        self.params_end
    }
}
