use crate::math::matrix::Matrix;

/// Categorical cross-entropy loss for use with a Softmax output layer.
pub struct CrossEntropyLoss;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// Scalar loss for one sample: L = -sum(expected[i] * log(predicted[i] + eps))
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        predicted.iter().zip(expected.iter())
            .map(|(p, e)| -e * (p + EPS).ln())
            .sum()
    }

    /// Mean loss over a `(batch, classes)` pair of matrices.
    pub fn batch_loss(predicted: &Matrix, expected: &Matrix) -> f64 {
        assert_eq!(predicted.shape(), expected.shape());
        if predicted.rows == 0 {
            return 0.0;
        }
        let total: f64 = (0..predicted.rows)
            .map(|r| CrossEntropyLoss::loss(predicted.row(r), expected.row(r)))
            .sum();
        total / predicted.rows as f64
    }

    /// Gradient of the batch-mean Softmax + cross-entropy w.r.t. the logits:
    ///   ∂L/∂z = (predicted - expected) / batch
    ///
    /// The Softmax layer's own derivative is identity, so this is not
    /// double-applied.
    pub fn batch_derivative(predicted: &Matrix, expected: &Matrix) -> Matrix {
        let batch = predicted.rows.max(1) as f64;
        (predicted - expected).scale(1.0 / batch)
    }
}
