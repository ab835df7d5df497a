pub mod activation;

pub use activation::{softmax_rows, ActivationFunction};
