//! Autograd: a computation graph of scalar nodes with reverse-mode differentiation.
//!
//! Nodes live in a [`Graph`] arena and are referred to by [`Value`] handles. The
//! graph is built during forward operations ([`Graph::add`], [`Graph::mul`], ...);
//! [`Graph::backward`] then propagates gradients from a loss node to every node it
//! depends on using the chain rule in reverse topological order.
//!
//! # Example
//!
//! ```
//! use microgpt_core::autograd::Graph;
//!
//! let mut g = Graph::new();
//! let x = g.leaf(3.0);
//! let y = g.mul(x, x);
//! g.backward(y);
//! assert_eq!(g.grad(x), 6.0);
//! ```

mod graph;
mod ops;

pub use graph::{Graph, Mark, Value};
pub use ops::Operand;
