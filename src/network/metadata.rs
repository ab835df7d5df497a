use serde::{Deserialize, Serialize};

use crate::vision::extractor::EmbeddingShape;

/// Optional annotations attached to a saved head.
/// All fields are Option<> so bare models deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    pub description: Option<String>,
    /// Shape of the embedding the head was trained on.
    pub input_shape: Option<EmbeddingShape>,
    /// Gesture names for the output units, in class-id order.
    pub output_labels: Option<Vec<String>>,
}
