//! Vector and matrix helpers over sequences of graph nodes.
//!
//! Everything here builds new nodes and never mutates its inputs. Length
//! disagreements are wiring bugs, so they panic instead of truncating.

use crate::autograd::{Graph, Value};

/// Row-major matrix of graph nodes (`[out][in]`).
pub type Matrix = Vec<Vec<Value>>;

/// Epsilon added to the mean square in [`rmsnorm`].
pub const RMSNORM_EPS: f64 = 1e-5;

/// Sum of `xs`, folded with `add` from a zero constant.
pub fn sum(g: &mut Graph, xs: &[Value]) -> Value {
    let zero = g.leaf(0.0);
    xs.iter().fold(zero, |acc, &x| g.add(acc, x))
}

/// Arithmetic mean of `xs`. An empty slice yields NaN.
pub fn mean(g: &mut Graph, xs: &[Value]) -> Value {
    let total = sum(g, xs);
    g.div(total, xs.len() as f64)
}

/// `sum_i a[i] * b[i]`.
pub fn dot_product(g: &mut Graph, a: &[Value], b: &[Value]) -> Value {
    assert_eq!(a.len(), b.len(), "dot_product: length mismatch");
    let zero = g.leaf(0.0);
    a.iter().zip(b).fold(zero, |acc, (&ai, &bi)| {
        let prod = g.mul(ai, bi);
        g.add(acc, prod)
    })
}

/// Matrix-vector product: one dot product per row of `w`.
pub fn linear(g: &mut Graph, x: &[Value], w: &[Vec<Value>]) -> Vec<Value> {
    w.iter()
        .map(|row| {
            assert_eq!(
                row.len(),
                x.len(),
                "linear: weight row width must equal input length"
            );
            dot_product(g, row, x)
        })
        .collect()
}

/// Element-wise `a + b`.
pub fn vector_add(g: &mut Graph, a: &[Value], b: &[Value]) -> Vec<Value> {
    assert_eq!(a.len(), b.len(), "vector_add: length mismatch");
    a.iter().zip(b).map(|(&ai, &bi)| g.add(ai, bi)).collect()
}

/// Standard transpose of a rectangular matrix.
#[must_use]
pub fn transpose<T: Copy>(m: &[Vec<T>]) -> Vec<Vec<T>> {
    let Some(first) = m.first() else {
        return Vec::new();
    };
    let cols = first.len();
    assert!(
        m.iter().all(|row| row.len() == cols),
        "transpose: rows must all have the same length"
    );
    (0..cols).map(|j| m.iter().map(|row| row[j]).collect()).collect()
}

/// Logits to probabilities in \[0,1] summing to 1. The max is subtracted first for stability.
pub fn softmax(g: &mut Graph, logits: &[Value]) -> Vec<Value> {
    let max_val = logits
        .iter()
        .map(|&v| g.data(v))
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<Value> = logits
        .iter()
        .map(|&l| {
            let shifted = g.sub(l, max_val);
            g.exp(shifted)
        })
        .collect();
    let total = sum(g, &exps);
    exps.iter().map(|&e| g.div(e, total)).collect()
}

/// Root-mean-square normalization without learned scale or shift.
pub fn rmsnorm(g: &mut Graph, x: &[Value]) -> Vec<Value> {
    let squares: Vec<Value> = x.iter().map(|&xi| g.pow(xi, 2.0)).collect();
    let ms = mean(g, &squares);
    let shifted = g.add(ms, RMSNORM_EPS);
    let scale = g.pow(shifted, -0.5);
    x.iter().map(|&xi| g.mul(xi, scale)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(g: &mut Graph, xs: &[f64]) -> Vec<Value> {
        xs.iter().map(|&x| g.leaf(x)).collect()
    }

    fn data(g: &Graph, xs: &[Value]) -> Vec<f64> {
        xs.iter().map(|&x| g.data(x)).collect()
    }

    #[test]
    fn sum_and_mean() {
        let mut g = Graph::new();
        let xs = leaves(&mut g, &[1.0, 2.0, 3.0, 6.0]);
        let s = sum(&mut g, &xs);
        let m = mean(&mut g, &xs);
        assert_eq!(g.data(s), 12.0);
        assert_eq!(g.data(m), 3.0);
        g.backward(m);
        for &x in &xs {
            assert!((g.grad(x) - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn linear_output_shape_and_values() {
        let mut g = Graph::new();
        let x = leaves(&mut g, &[1.0, 2.0]);
        let w = vec![
            leaves(&mut g, &[0.5, 0.5]),
            leaves(&mut g, &[1.0, 0.0]),
            leaves(&mut g, &[-1.0, 3.0]),
        ];
        let out = linear(&mut g, &x, &w);
        assert_eq!(data(&g, &out), vec![1.5, 1.0, 5.0]);
    }

    #[test]
    fn linear_backward_reaches_weights_and_input() {
        let mut g = Graph::new();
        let x = leaves(&mut g, &[1.0, 2.0]);
        let w = vec![leaves(&mut g, &[1.0, 2.0]), leaves(&mut g, &[3.0, 4.0])];
        let y = linear(&mut g, &x, &w);
        let total = sum(&mut g, &y);
        g.backward(total);
        // d/dx_i sum_o W[o][i] x_i = column sums
        assert_eq!(g.grad(x[0]), 4.0);
        assert_eq!(g.grad(x[1]), 6.0);
        assert_eq!(g.grad(w[1][0]), 1.0);
        assert_eq!(g.grad(w[1][1]), 2.0);
    }

    #[test]
    #[should_panic(expected = "linear")]
    fn linear_rejects_width_mismatch() {
        let mut g = Graph::new();
        let x = leaves(&mut g, &[1.0, 2.0, 3.0]);
        let w = vec![leaves(&mut g, &[1.0, 2.0])];
        let _ = linear(&mut g, &x, &w);
    }

    #[test]
    #[should_panic(expected = "dot_product")]
    fn dot_product_rejects_length_mismatch() {
        let mut g = Graph::new();
        let a = leaves(&mut g, &[1.0]);
        let b = leaves(&mut g, &[1.0, 2.0]);
        let _ = dot_product(&mut g, &a, &b);
    }

    #[test]
    #[should_panic(expected = "vector_add")]
    fn vector_add_rejects_length_mismatch() {
        let mut g = Graph::new();
        let a = leaves(&mut g, &[1.0, 2.0]);
        let b = leaves(&mut g, &[1.0]);
        let _ = vector_add(&mut g, &a, &b);
    }

    #[test]
    fn vector_add_is_elementwise() {
        let mut g = Graph::new();
        let a = leaves(&mut g, &[1.0, 2.0]);
        let b = leaves(&mut g, &[10.0, 20.0]);
        let c = vector_add(&mut g, &a, &b);
        assert_eq!(data(&g, &c), vec![11.0, 22.0]);
    }

    #[test]
    fn transpose_swaps_rows_and_columns() {
        let m = vec![vec![1, 2, 3], vec![4, 5, 6]];
        assert_eq!(transpose(&m), vec![vec![1, 4], vec![2, 5], vec![3, 6]]);
        assert!(transpose::<i32>(&[]).is_empty());
    }

    #[test]
    fn softmax_is_a_distribution() {
        let mut g = Graph::new();
        for input in [
            vec![0.0, 0.0, 0.0],
            vec![1.0, -2.0, 3.5, 0.25],
            vec![1000.0, 999.0, -1000.0],
            vec![-745.0, 0.0],
        ] {
            let logits = leaves(&mut g, &input);
            let probs = softmax(&mut g, &logits);
            let values = data(&g, &probs);
            assert!(values.iter().all(|p| p.is_finite() && (0.0..=1.0).contains(p)));
            assert!((values.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn softmax_is_shift_invariant() {
        let mut g = Graph::new();
        let base = [0.3, -1.2, 2.0, 0.0];
        let shifted: Vec<f64> = base.iter().map(|x| x + 42.0).collect();
        let a = leaves(&mut g, &base);
        let b = leaves(&mut g, &shifted);
        let pa = softmax(&mut g, &a);
        let pb = softmax(&mut g, &b);
        for (x, y) in data(&g, &pa).iter().zip(data(&g, &pb)) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn rmsnorm_gives_unit_rms() {
        let mut g = Graph::new();
        let x = leaves(&mut g, &[1.0, -2.0, 3.0, 4.0]);
        let out = rmsnorm(&mut g, &x);
        let values = data(&g, &out);
        let ms = values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64;
        assert!((ms - 1.0).abs() < 1e-5);
        // direction is preserved
        assert!(values[1] < 0.0 && values[3] > values[2]);
    }

    #[test]
    fn rmsnorm_backward_matches_finite_difference() {
        let inputs = [0.5, -1.0, 2.0];
        let eval = |xs: &[f64]| {
            let mut g = Graph::new();
            let x = leaves(&mut g, xs);
            let y = rmsnorm(&mut g, &x);
            g.data(y[0])
        };

        let mut g = Graph::new();
        let x = leaves(&mut g, &inputs);
        let y = rmsnorm(&mut g, &x);
        g.backward(y[0]);

        let eps = 1e-6;
        for i in 0..inputs.len() {
            let mut plus = inputs;
            let mut minus = inputs;
            plus[i] += eps;
            minus[i] -= eps;
            let numeric = (eval(&plus[..]) - eval(&minus[..])) / (2.0 * eps);
            assert!((numeric - g.grad(x[i])).abs() < 1e-6);
        }
    }
}
