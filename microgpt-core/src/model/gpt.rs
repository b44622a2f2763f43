//! Transformer forward pass over scalar nodes, and the next-token loss built on it.

use super::{KvCache, StateDict};
use crate::autograd::{Graph, Value};
use crate::linalg::{dot_product, linear, mean, rmsnorm, softmax, transpose, vector_add};

/// Runs one position through the model and returns `vocab_size` logits.
///
/// Appends this position's key and value to every layer of `cache`, so calls for
/// one sequence must come in increasing `pos_id` order starting at `cache.len()`.
///
/// # Panics
///
/// When `token_id >= vocab_size`, `pos_id >= block_size`, or `cache` was built for
/// a different layer count.
pub fn gpt(
    state: &mut StateDict,
    token_id: usize,
    pos_id: usize,
    cache: &mut KvCache,
) -> Vec<Value> {
    let vocab_size = state.vocab_size();
    let (g, w, config) = state.parts_mut();
    assert!(
        token_id < vocab_size,
        "gpt: token id {token_id} out of range for vocab_size {vocab_size}"
    );
    assert!(
        pos_id < config.block_size,
        "gpt: position {pos_id} out of range for block_size {}",
        config.block_size
    );
    assert_eq!(cache.n_layer(), config.n_layer, "gpt: cache layer count must equal n_layer");

    let x = vector_add(g, &w.wte[token_id], &w.wpe[pos_id]);
    let mut x = rmsnorm(g, &x);

    for layer in 0..config.n_layer {
        // attention
        let residual = x;
        let xn = rmsnorm(g, &residual);
        let q = linear(g, &xn, &w.attn_wq[layer]);
        let k = linear(g, &xn, &w.attn_wk[layer]);
        let v = linear(g, &xn, &w.attn_wv[layer]);
        cache.push(layer, k, v);
        let (heads, _) = attention(g, &q, cache.keys(layer), cache.values(layer), config.n_head);
        let attn_out = linear(g, &heads, &w.attn_wo[layer]);
        x = vector_add(g, &attn_out, &residual);

        // mlp
        let residual = x;
        let xn = rmsnorm(g, &residual);
        let hidden = linear(g, &xn, &w.mlp_fc1[layer]);
        let hidden: Vec<Value> = hidden.into_iter().map(|h| g.relu(h)).collect();
        let mlp_out = linear(g, &hidden, &w.mlp_fc2[layer]);
        x = vector_add(g, &mlp_out, &residual);
    }

    linear(g, &x, &w.lm_head)
}

/// Multi-head scaled dot-product attention of one query against every cached position.
///
/// Returns the head outputs concatenated in head order, and each head's attention
/// weights (one per cached position).
pub(crate) fn attention(
    g: &mut Graph,
    q: &[Value],
    keys: &[Vec<Value>],
    values: &[Vec<Value>],
    n_head: usize,
) -> (Vec<Value>, Vec<Vec<Value>>) {
    let head_dim = q.len() / n_head;
    let scale = (head_dim as f64).sqrt();
    let mut out = Vec::with_capacity(q.len());
    let mut weights = Vec::with_capacity(n_head);

    for h in 0..n_head {
        let hs = h * head_dim..(h + 1) * head_dim;
        let q_h = &q[hs.clone()];
        let logits: Vec<Value> = keys
            .iter()
            .map(|k| {
                let score = dot_product(g, q_h, &k[hs.clone()]);
                g.div(score, scale)
            })
            .collect();
        let w = softmax(g, &logits);

        let v_h: Vec<Vec<Value>> = values.iter().map(|v| v[hs.clone()].to_vec()).collect();
        for column in transpose(&v_h) {
            out.push(dot_product(g, &w, &column));
        }
        weights.push(w);
    }
    (out, weights)
}

/// Mean next-token cross-entropy over the first `min(block_size, tokens.len() - 1)` positions.
///
/// Builds the whole graph for the sequence on top of the parameters and returns its root.
/// The caller owns the transient nodes; see [`StateDict::clear_graph`].
///
/// # Panics
///
/// When `tokens` has fewer than two entries or holds an id outside the vocabulary.
pub fn forward(state: &mut StateDict, tokens: &[usize]) -> Value {
    assert!(
        tokens.len() >= 2,
        "forward: need at least two tokens, got {}",
        tokens.len()
    );
    let n = state.config().block_size.min(tokens.len() - 1);
    let mut cache = KvCache::new(state.config().n_layer);
    let mut losses = Vec::with_capacity(n);
    for pos_id in 0..n {
        let target = tokens[pos_id + 1];
        assert!(
            target < state.vocab_size(),
            "forward: target id {target} out of range for vocab_size {}",
            state.vocab_size()
        );
        let logits = gpt(state, tokens[pos_id], pos_id, &mut cache);
        let g = state.graph_mut();
        let probs = softmax(g, &logits);
        let log_p = g.log(probs[target]);
        losses.push(g.neg(log_p));
    }
    mean(state.graph_mut(), &losses)
}
