//! Elementary differentiable operations on [`Graph`] nodes.
//!
//! Every binary operation is symmetric in what it accepts: either side may be an
//! existing [`Value`] or a bare `f64`, which is lifted to a fresh leaf.

use super::graph::{Graph, Value};

/// Operand of an elementary operation: a node already in the graph, or a constant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operand {
    /// An existing node.
    Node(Value),
    /// A plain number, lifted to a zero-input leaf when used.
    Const(f64),
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Node(v)
    }
}

impl From<&Value> for Operand {
    fn from(v: &Value) -> Self {
        Operand::Node(*v)
    }
}

impl From<f64> for Operand {
    fn from(c: f64) -> Self {
        Operand::Const(c)
    }
}

impl Graph {
    /// Returns the node for `operand`, creating a constant leaf when needed.
    pub fn lift(&mut self, operand: impl Into<Operand>) -> Value {
        match operand.into() {
            Operand::Node(v) => v,
            Operand::Const(c) => self.leaf(c),
        }
    }

    // -------------------------------------------------------------------------
    // primitives: each records its forward value and local partials
    // -------------------------------------------------------------------------

    /// `a + b`. Local grads are 1 and 1.
    pub fn add(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Value {
        let a = self.lift(a);
        let b = self.lift(b);
        let data = self.data(a) + self.data(b);
        self.push(data, vec![a, b], vec![1.0, 1.0])
    }

    /// `a * b`. Local grads are `b` and `a`.
    pub fn mul(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Value {
        let a = self.lift(a);
        let b = self.lift(b);
        let (da, db) = (self.data(a), self.data(b));
        self.push(da * db, vec![a, b], vec![db, da])
    }

    /// `a^exponent` for a constant exponent. Local grad is `n * a^(n-1)`.
    ///
    /// Any real exponent is accepted, but a negative base with a non-integral
    /// exponent has no real result; callers only use it on non-negative bases
    /// (mean square plus epsilon, positive denominators).
    pub fn pow(&mut self, a: impl Into<Operand>, exponent: f64) -> Value {
        let a = self.lift(a);
        let base = self.data(a);
        debug_assert!(
            base >= 0.0 || exponent.fract() == 0.0 || base.is_nan(),
            "pow: fractional exponent {exponent} of negative base {base}"
        );
        let local = exponent * base.powf(exponent - 1.0);
        self.push(base.powf(exponent), vec![a], vec![local])
    }

    /// Natural log. Local grad is `1/a`; non-positive inputs give non-finite results.
    pub fn log(&mut self, a: impl Into<Operand>) -> Value {
        let a = self.lift(a);
        let x = self.data(a);
        self.push(x.ln(), vec![a], vec![1.0 / x])
    }

    /// `e^a`. Local grad is `e^a`.
    pub fn exp(&mut self, a: impl Into<Operand>) -> Value {
        let a = self.lift(a);
        let data = self.data(a).exp();
        self.push(data, vec![a], vec![data])
    }

    /// `max(0, a)`. Local grad is 1 if `a > 0`, else 0.
    pub fn relu(&mut self, a: impl Into<Operand>) -> Value {
        let a = self.lift(a);
        let x = self.data(a);
        let local = if x > 0.0 { 1.0 } else { 0.0 };
        let out = if x > 0.0 || x.is_nan() { x } else { 0.0 };
        self.push(out, vec![a], vec![local])
    }

    // -------------------------------------------------------------------------
    // derived: built from the primitives above
    // -------------------------------------------------------------------------

    /// `-a`, as `a * -1`.
    pub fn neg(&mut self, a: impl Into<Operand>) -> Value {
        self.mul(a, -1.0)
    }

    /// `a - b`, as `a + (-b)`.
    pub fn sub(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Value {
        let neg_b = self.neg(b);
        self.add(a, neg_b)
    }

    /// `a / b`, as `a * b^-1`.
    pub fn div(&mut self, a: impl Into<Operand>, b: impl Into<Operand>) -> Value {
        let inv_b = self.pow(b, -1.0);
        self.mul(a, inv_b)
    }
}
