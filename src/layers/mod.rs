pub mod dense;
pub mod dropout;

use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

pub use dense::{Dense, DenseGradients};
pub use dropout::Dropout;

/// One stage of the classifier head.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    Dense(Dense),
    Dropout(Dropout),
}

impl Layer {
    /// Training-mode forward pass (dropout active, caches kept for backprop).
    pub fn forward<R: Rng + ?Sized>(&mut self, input: &Matrix, rng: &mut R) -> Matrix {
        match self {
            Layer::Dense(dense) => dense.forward(input),
            Layer::Dropout(dropout) => dropout.forward(input, rng),
        }
    }

    pub fn infer(&self, input: &Matrix) -> Matrix {
        match self {
            Layer::Dense(dense) => dense.infer(input),
            Layer::Dropout(_) => input.clone(),
        }
    }
}
