use serde::{Serialize, Deserialize};

use crate::error::{GestureError, Result};
use crate::math::matrix::Matrix;
use crate::network::network::ClassifierHead;
use crate::vision::extractor::FeatureExtractor;
use crate::vision::Frame;

/// Raw classification of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_id: usize,
    /// Highest softmax probability as a percentage in [0, 100].
    pub confidence: f64,
}

/// Embeds `frame` and runs it through `head`.
pub fn classify(head: &ClassifierHead, extractor: &dyn FeatureExtractor, frame: &Frame) -> Result<Prediction> {
    let embedding = extractor.embed(frame)?;
    predict_embedding(head, embedding)
}

/// Argmax class and confidence for one flattened embedding.
pub fn predict_embedding(head: &ClassifierHead, embedding: Vec<f64>) -> Result<Prediction> {
    if embedding.len() != head.input_size() {
        return Err(GestureError::ShapeMismatch { expected: head.input_size(), got: embedding.len() });
    }
    let n = embedding.len();
    let probs = head.predict(&Matrix::from_vec(1, n, embedding))?;
    if !probs.is_finite() {
        return Err(GestureError::PredictionFailed("non-finite class probabilities".into()));
    }
    let class_id = probs.row_argmax(0);
    Ok(Prediction { class_id, confidence: probs.get(0, class_id) * 100.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::network::spec::HeadSpec;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn confidence_is_a_percentage_of_the_winning_class() {
        let mut rng = StdRng::seed_from_u64(9);
        let head = ClassifierHead::new(HeadSpec::for_classes(4, 5, &TrainingConfig::default()), &mut rng);
        let p = predict_embedding(&head, vec![0.3, 0.1, 0.9, 0.5]).unwrap();
        assert!(p.class_id < 5);
        assert!(p.confidence >= 20.0 && p.confidence <= 100.0);

        let err = predict_embedding(&head, vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, GestureError::ShapeMismatch { expected: 4, got: 3 }));
    }
}
