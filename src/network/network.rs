use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{GestureError, Result};
use crate::layers::{Dense, DenseGradients, Dropout, Layer};
use crate::math::matrix::Matrix;
use crate::network::spec::{bias_name, kernel_name, HeadSpec, LayerSpec};
use crate::optim::adam::Adam;

/// Trainable classification head sitting on top of frozen embeddings.
///
/// The class count is fixed for the lifetime of a head; a different K needs
/// a new head built from a new `HeadSpec`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierHead {
    pub spec: HeadSpec,
    pub layers: Vec<Layer>,
}

impl ClassifierHead {
    /// Builds freshly initialised layers from `spec`.
    pub fn new<R: Rng + ?Sized>(spec: HeadSpec, rng: &mut R) -> ClassifierHead {
        let layers = spec.layers.iter()
            .map(|layer| match *layer {
                LayerSpec::Dense { units, input_size, activation, l2 } => {
                    Layer::Dense(Dense::new(units, input_size, activation, l2, rng))
                }
                LayerSpec::Dropout { rate } => Layer::Dropout(Dropout::new(rate)),
            })
            .collect();
        ClassifierHead { spec, layers }
    }

    pub fn num_classes(&self) -> usize {
        self.spec.num_classes
    }

    pub fn input_size(&self) -> usize {
        self.spec.input_size
    }

    /// Training-mode forward pass over a `(batch, input_size)` matrix;
    /// dropout is active and activations are cached for `backward`.
    pub fn forward_train<R: Rng + ?Sized>(&mut self, input: &Matrix, rng: &mut R) -> Matrix {
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current, rng);
        }
        current
    }

    /// Softmax probabilities `(batch, num_classes)`; dropout disabled.
    pub fn predict(&self, input: &Matrix) -> Result<Matrix> {
        if input.cols != self.input_size() {
            return Err(GestureError::ShapeMismatch { expected: self.input_size(), got: input.cols });
        }
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.infer(&current);
        }
        Ok(current)
    }

    /// Backpropagates ∂L/∂logits through the head, returning the gradients
    /// of every dense layer keyed by its layer index.
    pub fn backward(&self, grad_output: &Matrix) -> Vec<(usize, DenseGradients)> {
        let mut grads = Vec::new();
        let mut delta = grad_output.clone();
        for (i, layer) in self.layers.iter().enumerate().rev() {
            delta = match layer {
                Layer::Dense(dense) => {
                    let g = dense.backward(&delta);
                    let next = g.input.clone();
                    grads.push((i, g));
                    next
                }
                Layer::Dropout(dropout) => dropout.backward(&delta),
            };
        }
        grads
    }

    /// Applies one optimizer step with gradients from `backward`.
    pub fn apply_gradients(&mut self, grads: &[(usize, DenseGradients)], optimizer: &mut Adam) {
        optimizer.next_step();
        for (i, g) in grads {
            if let Layer::Dense(dense) = &mut self.layers[*i] {
                optimizer.step(&kernel_name(*i), &mut dense.weights, &g.weights);
                optimizer.step(&bias_name(*i), &mut dense.biases, &g.biases);
            }
        }
    }

    /// Trainable tensors in layer order, kernel before bias.
    pub fn named_parameters(&self) -> Vec<(String, &Matrix)> {
        let mut params = Vec::new();
        for (i, layer) in self.layers.iter().enumerate() {
            if let Layer::Dense(dense) = layer {
                params.push((kernel_name(i), &dense.weights));
                params.push((bias_name(i), &dense.biases));
            }
        }
        params
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Matrix> {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            if let Layer::Dense(dense) = layer {
                if name == kernel_name(i) {
                    return Some(&mut dense.weights);
                }
                if name == bias_name(i) {
                    return Some(&mut dense.biases);
                }
            }
        }
        None
    }

    /// Sum of the L2 penalties of all dense kernels.
    pub fn l2_penalty(&self) -> f64 {
        self.dense_layers().map(Dense::penalty).sum()
    }

    pub fn dense_layers(&self) -> impl Iterator<Item = &Dense> {
        self.layers.iter().filter_map(|layer| match layer {
            Layer::Dense(dense) => Some(dense),
            Layer::Dropout(_) => None,
        })
    }

    pub fn dense_layers_mut(&mut self) -> impl Iterator<Item = &mut Dense> {
        self.layers.iter_mut().filter_map(|layer| match layer {
            Layer::Dense(dense) => Some(dense),
            Layer::Dropout(_) => None,
        })
    }

    /// Checks that the layers agree with `spec` and that `spec` chains from
    /// the embedding to the class count (used after deserializing).
    pub fn validate(&self) -> Result<()> {
        self.spec.check_chain()?;
        let malformed = |why: String| GestureError::ModelStore(format!("malformed model: {}", why));
        if self.layers.len() != self.spec.layers.len() {
            return Err(malformed(format!("{} layers, spec lists {}", self.layers.len(), self.spec.layers.len())));
        }
        for (i, (layer, spec)) in self.layers.iter().zip(&self.spec.layers).enumerate() {
            match (layer, spec) {
                (Layer::Dense(d), LayerSpec::Dense { units, input_size, .. }) => {
                    if d.weights.shape() != (*input_size, *units) || d.biases.shape() != (1, *units) {
                        return Err(malformed(format!("layer {} has kernel {:?}", i, d.weights.shape())));
                    }
                    if d.weights.data.len() != input_size * units || !d.weights.is_finite() {
                        return Err(malformed(format!("layer {} has a corrupt kernel", i)));
                    }
                }
                (Layer::Dropout(_), LayerSpec::Dropout { .. }) => {}
                _ => return Err(malformed(format!("layer {} does not match its spec", i))),
            }
        }
        Ok(())
    }

    /// Serializes the head (architecture and weights) to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a head previously written by `save_json`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<ClassifierHead> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let head: ClassifierHead = serde_json::from_reader(reader)?;
        head.validate()?;
        Ok(head)
    }
}
