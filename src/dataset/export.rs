use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::dataset::store::ExampleStore;
use crate::error::{GestureError, Result};

/// Flattened dataset dump: `xs` holds every embedding back to back, `ys`
/// every one-hot label row back to back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetExport {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl DatasetExport {
    /// Requires labels to have been encoded (i.e. a training run happened).
    pub fn from_store(store: &ExampleStore) -> Result<DatasetExport> {
        let ys = store.encoded().ok_or(GestureError::DatasetNotEncoded)?;
        Ok(DatasetExport {
            xs: store.embeddings().iter().flatten().copied().collect(),
            ys: ys.data.clone(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::extractor::EmbeddingShape;

    #[test]
    fn flattens_in_insertion_order() {
        let mut store = ExampleStore::new(EmbeddingShape::new(1, 1, 2));
        store.add_example(vec![0.1, 0.2], 1).unwrap();
        store.add_example(vec![0.3, 0.4], 0).unwrap();
        assert!(matches!(DatasetExport::from_store(&store), Err(GestureError::DatasetNotEncoded)));

        store.encode_labels(5).unwrap();
        let export = DatasetExport::from_store(&store).unwrap();
        assert_eq!(export.xs, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(export.ys, vec![0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(export.to_json().unwrap().starts_with(r#"{"xs":[0.1,0.2,0.3,0.4],"ys":"#));
    }
}
