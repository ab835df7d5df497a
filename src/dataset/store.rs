use crate::error::{GestureError, Result};
use crate::math::matrix::Matrix;
use crate::vision::extractor::EmbeddingShape;

/// Collected (embedding, label) examples in insertion order.
///
/// Raw labels are authoritative. The one-hot matrix is derived from them by
/// `encode_labels` and dropped whenever the examples change.
#[derive(Debug, Clone)]
pub struct ExampleStore {
    shape: EmbeddingShape,
    embeddings: Vec<Vec<f64>>,
    labels: Vec<usize>,
    encoded: Option<Matrix>,
}

impl ExampleStore {
    pub fn new(shape: EmbeddingShape) -> ExampleStore {
        ExampleStore { shape, embeddings: Vec::new(), labels: Vec::new(), encoded: None }
    }

    pub fn shape(&self) -> EmbeddingShape {
        self.shape
    }

    /// Appends one example. The label range is not checked here; see
    /// `encode_labels`.
    pub fn add_example(&mut self, embedding: Vec<f64>, label: usize) -> Result<()> {
        let expected = self.shape.flat_len();
        if embedding.len() != expected {
            return Err(GestureError::ShapeMismatch { expected, got: embedding.len() });
        }
        self.embeddings.push(embedding);
        self.labels.push(label);
        self.encoded = None;
        Ok(())
    }

    /// Regenerates the one-hot label matrix `(len, num_classes)` in
    /// insertion order, discarding any previous encoding.
    pub fn encode_labels(&mut self, num_classes: usize) -> Result<&Matrix> {
        self.encoded = None;
        if let Some(&label) = self.labels.iter().find(|&&l| l >= num_classes) {
            return Err(GestureError::LabelOutOfRange { label, num_classes });
        }
        let mut ys = Matrix::zeros(self.labels.len(), num_classes);
        for (row, &label) in self.labels.iter().enumerate() {
            ys.row_mut(row)[label] = 1.0;
        }
        Ok(self.encoded.insert(ys))
    }

    pub fn encoded(&self) -> Option<&Matrix> {
        self.encoded.as_ref()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn embeddings(&self) -> &[Vec<f64>] {
        &self.embeddings
    }

    pub fn count(&self, label: usize) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    /// Stacks all embeddings into a `(len, flat_len)` matrix.
    pub fn xs(&self) -> Matrix {
        let rows: Vec<&[f64]> = self.embeddings.iter().map(Vec::as_slice).collect();
        let mut xs = Matrix::from_rows(&rows);
        xs.cols = self.shape.flat_len();
        xs
    }

    pub fn clear(&mut self) {
        self.embeddings.clear();
        self.labels.clear();
        self.encoded = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(labels: &[usize]) -> ExampleStore {
        let mut store = ExampleStore::new(EmbeddingShape::new(1, 1, 2));
        for (i, &label) in labels.iter().enumerate() {
            store.add_example(vec![i as f64, -(i as f64)], label).unwrap();
        }
        store
    }

    #[test]
    fn one_row_per_example_with_hot_index() {
        let mut store = store_with(&[2, 0, 4, 4, 1]);
        assert_eq!(store.len(), 5);
        let ys = store.encode_labels(5).unwrap().clone();
        assert_eq!(ys.shape(), (5, 5));
        for (row, &label) in [2, 0, 4, 4, 1].iter().enumerate() {
            let hot: Vec<usize> = (0..5).filter(|&c| ys.get(row, c) == 1.0).collect();
            assert_eq!(hot, vec![label]);
            assert_eq!(ys.row(row).iter().sum::<f64>(), 1.0);
        }
    }

    #[test]
    fn encoding_is_idempotent() {
        let mut store = store_with(&[3, 1, 0]);
        let first = store.encode_labels(6).unwrap().clone();
        let second = store.encode_labels(6).unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn label_out_of_range_leaves_no_encoding() {
        let mut store = store_with(&[0, 5]);
        store.encode_labels(6).unwrap();
        let err = store.encode_labels(5).unwrap_err();
        assert!(matches!(err, GestureError::LabelOutOfRange { label: 5, num_classes: 5 }));
        assert!(store.encoded().is_none());
    }

    #[test]
    fn rejects_wrong_shape_and_invalidates_encoding() {
        let mut store = store_with(&[0]);
        store.encode_labels(5).unwrap();
        assert!(store.add_example(vec![1.0], 0).is_err());
        assert_eq!(store.len(), 1);
        store.add_example(vec![1.0, 2.0], 1).unwrap();
        assert!(store.encoded().is_none());
        assert_eq!(store.count(1), 1);
        assert_eq!(store.xs().shape(), (2, 2));
    }
}
