//! Arena-backed computation graph of scalar nodes.

/// Handle to a scalar node stored in a [`Graph`].
///
/// Handles are plain indices: copying one never copies the node, and a node may
/// be consumed by any number of downstream nodes (the graph is a DAG). A handle
/// is only meaningful for the graph that created it, and only until that graph
/// is rewound past it (see [`Graph::rewind`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(usize);

impl Value {
    /// Position of this node in its arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Position in the arena returned by [`Graph::mark`]; everything created after it
/// can be dropped with [`Graph::rewind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mark(usize);

/// One scalar: forward value, accumulated gradient, and graph edges for backprop.
#[derive(Clone, Debug)]
struct Node {
    data: f64,
    grad: f64,
    /// Operands that produced this node; empty for leaves.
    inputs: Vec<Value>,
    /// d(this)/d(input) for each input, evaluated at the forward value.
    local_grads: Vec<f64>,
}

/// Owns every node of a computation graph.
///
/// Nodes only ever reference nodes created before them, so arena order is a
/// valid topological order. Parameters are created first and survive
/// [`rewind`](Graph::rewind) to a mark taken after them; transient nodes of a
/// forward pass live above that mark.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty graph with room for `capacity` nodes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Graph {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Number of nodes currently in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the arena holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Creates a leaf node (no inputs) with the given value and zero gradient.
    pub fn leaf(&mut self, data: f64) -> Value {
        self.push(data, Vec::new(), Vec::new())
    }

    /// Creates a node that remembers its inputs and local gradients for backprop.
    pub(crate) fn push(&mut self, data: f64, inputs: Vec<Value>, local_grads: Vec<f64>) -> Value {
        assert_eq!(
            inputs.len(),
            local_grads.len(),
            "node needs exactly one local gradient per input"
        );
        let id = Value(self.nodes.len());
        debug_assert!(inputs.iter().all(|input| input.0 < id.0));
        self.nodes.push(Node {
            data,
            grad: 0.0,
            inputs,
            local_grads,
        });
        id
    }

    /// Forward value of `v`.
    #[must_use]
    pub fn data(&self, v: Value) -> f64 {
        self.nodes[v.0].data
    }

    /// Gradient of the last [`backward`](Graph::backward) root with respect to `v`.
    #[must_use]
    pub fn grad(&self, v: Value) -> f64 {
        self.nodes[v.0].grad
    }

    /// Overwrites the forward value of a node (used by optimizers on parameters).
    pub fn set_data(&mut self, v: Value, data: f64) {
        self.nodes[v.0].data = data;
    }

    /// Resets the gradient of `v` to zero.
    pub fn zero_grad(&mut self, v: Value) {
        self.nodes[v.0].grad = 0.0;
    }

    /// Operands of `v`, in order.
    #[must_use]
    pub fn inputs(&self, v: Value) -> &[Value] {
        &self.nodes[v.0].inputs
    }

    /// Local partial derivatives of `v`, one per input.
    #[must_use]
    pub fn local_grads(&self, v: Value) -> &[f64] {
        &self.nodes[v.0].local_grads
    }

    /// Remembers the current arena length.
    #[must_use]
    pub fn mark(&self) -> Mark {
        Mark(self.nodes.len())
    }

    /// Drops every node created after `mark`. Handles to those nodes become invalid.
    pub fn rewind(&mut self, mark: Mark) {
        self.nodes.truncate(mark.0);
    }

    /// Reverse-mode differentiation from `root`.
    ///
    /// Seeds `root` with gradient 1, then visits every node reachable from it in
    /// reverse topological order, adding `local_grad[i] * node.grad` into
    /// `inputs[i].grad`. Gradients accumulate: a node consumed by several
    /// downstream nodes receives the sum of all paths, and a second call adds
    /// on top of the first.
    pub fn backward(&mut self, root: Value) {
        let reachable = self.reachable_from(root);

        self.nodes[root.0].grad = 1.0;
        for id in (0..=root.0).rev() {
            if !reachable[id] {
                continue;
            }
            let grad = self.nodes[id].grad;
            for i in 0..self.nodes[id].inputs.len() {
                let input = self.nodes[id].inputs[i];
                let local = self.nodes[id].local_grads[i];
                self.nodes[input.0].grad += local * grad;
            }
        }
    }

    /// Marks every node `root` depends on. Iterative so deep graphs cannot overflow the stack.
    fn reachable_from(&self, root: Value) -> Vec<bool> {
        let mut visited = vec![false; root.0 + 1];
        let mut stack = vec![root];
        while let Some(v) = stack.pop() {
            if visited[v.0] {
                continue;
            }
            visited[v.0] = true;
            stack.extend(self.nodes[v.0].inputs.iter().filter(|input| !visited[input.0]));
        }
        visited
    }
}
