use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    ReLU,
    /// Softmax is vector-valued; `apply` normalises each row with
    /// `softmax_rows`.
    Softmax,
}

impl ActivationFunction {
    /// Applies the activation to a whole `(batch, units)` pre-activation matrix.
    pub fn apply(&self, z: &Matrix) -> Matrix {
        match self {
            ActivationFunction::ReLU => z.map(|x| if x > 0.0 { x } else { 0.0 }),
            ActivationFunction::Softmax => softmax_rows(z),
        }
    }

    /// Element-wise derivative at pre-activation `x`.
    ///
    /// Softmax is always paired with cross-entropy, whose combined gradient
    /// `predicted - expected` is already w.r.t. the logits, so it passes the
    /// delta through unchanged.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Softmax => 1.0,
        }
    }
}

/// Numerically stable softmax over each row.
pub fn softmax_rows(z: &Matrix) -> Matrix {
    let mut out = z.clone();
    for r in 0..out.rows {
        let row = out.row_mut(r);
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for x in row.iter_mut() {
            *x = (*x - max).exp();
            sum += *x;
        }
        for x in row.iter_mut() {
            *x /= sum;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_rows_sum_to_one() {
        let z = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 1000.0, 1000.0, 1000.0]);
        let p = softmax_rows(&z);
        for r in 0..2 {
            let sum: f64 = p.row(r).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
        assert!(p.get(0, 2) > p.get(0, 1));
        assert!((p.get(1, 0) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn relu_clamps_negatives() {
        let z = Matrix::from_vec(1, 3, vec![-2.0, 0.0, 1.5]);
        assert_eq!(ActivationFunction::ReLU.apply(&z).data, vec![0.0, 0.0, 1.5]);
        assert_eq!(ActivationFunction::ReLU.derivative(-1.0), 0.0);
        assert_eq!(ActivationFunction::ReLU.derivative(2.0), 1.0);
    }
}
