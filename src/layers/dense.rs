use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Fully connected layer with an optional L2 penalty on its kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub units: usize,
    pub input_size: usize,
    /// Kernel, shape `(input_size, units)`.
    pub weights: Matrix,
    /// Shape `(1, units)`.
    pub biases: Matrix,
    pub activator: ActivationFunction,
    /// Coefficient of the `l2 * sum(w²)` kernel penalty.
    pub l2: f64,
    #[serde(skip)]
    input: Matrix,
    #[serde(skip)]
    pre_neurons: Matrix, // z = XW + b, kept for the activation derivative
}

/// Gradients produced by `Dense::backward`.
#[derive(Debug, Clone)]
pub struct DenseGradients {
    pub weights: Matrix,
    pub biases: Matrix,
    /// ∂L/∂input, handed to the previous layer.
    pub input: Matrix,
}

impl Dense {
    /// ReLU layers start from He-initialised kernels, the softmax output from
    /// Xavier. Biases start at zero.
    pub fn new<R: Rng + ?Sized>(
        units: usize,
        input_size: usize,
        activation: ActivationFunction,
        l2: f64,
        rng: &mut R,
    ) -> Dense {
        let weights = match activation {
            ActivationFunction::ReLU => Matrix::he(input_size, units, rng),
            ActivationFunction::Softmax => Matrix::xavier(input_size, units, rng),
        };
        Dense {
            units,
            input_size,
            weights,
            biases: Matrix::zeros(1, units),
            activator: activation,
            l2,
            input: Matrix::default(),
            pre_neurons: Matrix::default(),
        }
    }

    /// Training-mode forward pass; caches what `backward` needs.
    pub fn forward(&mut self, input: &Matrix) -> Matrix {
        let z = input.matmul(&self.weights).add_row(&self.biases);
        let a = self.activator.apply(&z);
        self.input = input.clone();
        self.pre_neurons = z;
        a
    }

    /// Inference-only forward pass, no caching.
    pub fn infer(&self, input: &Matrix) -> Matrix {
        let z = input.matmul(&self.weights).add_row(&self.biases);
        self.activator.apply(&z)
    }

    /// `grad_out` is ∂L/∂a for this layer's output, already averaged over
    /// the batch. The kernel gradient includes the L2 term.
    pub fn backward(&self, grad_out: &Matrix) -> DenseGradients {
        let act_derivative = self.pre_neurons.map(|x| self.activator.derivative(x));
        let delta = grad_out.hadamard(&act_derivative);

        let mut weights = self.input.transpose().matmul(&delta);
        if self.l2 > 0.0 {
            weights = &weights + &self.weights.scale(2.0 * self.l2);
        }
        let biases = delta.sum_rows();
        let input = delta.matmul(&self.weights.transpose());

        DenseGradients { weights, biases, input }
    }

    /// L2 contribution to the loss.
    pub fn penalty(&self) -> f64 {
        self.l2 * self.weights.sum_squares()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn backward_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = Dense::new(2, 3, ActivationFunction::ReLU, 0.01, &mut rng);
        layer.biases = Matrix::from_vec(1, 2, vec![0.5, 0.5]);
        let x = Matrix::from_vec(1, 3, vec![0.2, 0.4, 0.9]);

        // L = sum(a) + penalty, so dL/da = 1.
        let loss = |l: &Dense| l.infer(&x).data.iter().sum::<f64>() + l.penalty();
        layer.forward(&x);
        let grads = layer.backward(&Matrix::from_vec(1, 2, vec![1.0, 1.0]));

        let h = 1e-6;
        for idx in 0..layer.weights.data.len() {
            let mut plus = layer.clone();
            plus.weights.data[idx] += h;
            let mut minus = layer.clone();
            minus.weights.data[idx] -= h;
            let numeric = (loss(&plus) - loss(&minus)) / (2.0 * h);
            assert!((numeric - grads.weights.data[idx]).abs() < 1e-5);
        }
    }
}
