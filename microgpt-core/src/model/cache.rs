//! Per-layer key/value history for one sequence.

use crate::autograd::Value;

/// Keys and values of every position processed so far, one history per layer.
///
/// Positions are only ever appended, so position `t` can attend to positions
/// `0..=t` and nothing later. A cache belongs to one sequence: [`forward`](super::forward)
/// and [`InferenceStepwise`](super::InferenceStepwise) each start from an empty one.
#[derive(Clone, Debug, Default)]
pub struct KvCache {
    keys: Vec<Vec<Vec<Value>>>,
    values: Vec<Vec<Vec<Value>>>,
}

impl KvCache {
    /// Creates an empty cache for `n_layer` layers.
    #[must_use]
    pub fn new(n_layer: usize) -> Self {
        KvCache {
            keys: vec![Vec::new(); n_layer],
            values: vec![Vec::new(); n_layer],
        }
    }

    #[must_use]
    pub fn n_layer(&self) -> usize {
        self.keys.len()
    }

    /// Number of positions cached (taken from the first layer; all layers advance together).
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached key vectors of `layer`, oldest first.
    #[must_use]
    pub fn keys(&self, layer: usize) -> &[Vec<Value>] {
        &self.keys[layer]
    }

    /// Cached value vectors of `layer`, oldest first.
    #[must_use]
    pub fn values(&self, layer: usize) -> &[Vec<Value>] {
        &self.values[layer]
    }

    pub(crate) fn push(&mut self, layer: usize, key: Vec<Value>, value: Vec<Value>) {
        self.keys[layer].push(key);
        self.values[layer].push(value);
    }

    /// Forgets every position, keeping the layer count.
    pub fn clear(&mut self) {
        self.keys.iter_mut().for_each(Vec::clear);
        self.values.iter_mut().for_each(Vec::clear);
    }
}
