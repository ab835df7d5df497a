use std::fmt;
use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::config::StorageConfig;
use crate::error::{GestureError, Result};
use crate::game::gesture::Gesture;
use crate::network::network::ClassifierHead;
use crate::network::spec::HeadSpec;
use crate::persist::kv::KeyValueStore;

const FORMAT: &str = "ferrite-gesture/head-v1";
const WEIGHTS_SUFFIX: &str = ".weights.bin";

/// One tensor in the weights file, in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub name: String,
    pub shape: [usize; 2],
}

/// Contents of `<name>.json`: architecture, labels and the layout of
/// `<name>.weights.bin` (little-endian f64, manifest order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format: String,
    pub spec: HeadSpec,
    pub labels: Vec<String>,
    pub weights_manifest: Vec<WeightEntry>,
}

/// Where a model was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Local,
    Bundled,
    Manual,
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelSource::Local => "local store",
            ModelSource::Bundled => "bundled model",
            ModelSource::Manual => "manual file pair",
        })
    }
}

/// A user-supplied `<name>.json` / `<name>.weights.bin` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFiles {
    pub json: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// The weights file next to `json`, sharing its stem.
    pub fn beside(json: impl AsRef<Path>) -> ModelFiles {
        let json = json.as_ref().to_path_buf();
        let stem = json.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let weights = json.with_file_name(format!("{}{}", stem, WEIGHTS_SUFFIX));
        ModelFiles { json, weights }
    }

    fn stems_match(&self) -> bool {
        let name = |p: &Path| p.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let json = name(&self.json);
        let weights = name(&self.weights);
        let json_stem = json.trim_end_matches(".json");
        let weights_stem = weights.trim_end_matches(WEIGHTS_SUFFIX).trim_end_matches(".bin");
        json_stem == weights_stem
    }
}

/// Writes `head` as a file pair into `dir`.
pub fn save_pair(head: &ClassifierHead, dir: impl AsRef<Path>, name: &str) -> Result<ModelFiles> {
    std::fs::create_dir_all(dir.as_ref())?;
    let files = ModelFiles::beside(dir.as_ref().join(format!("{}.json", name)));

    let params = head.named_parameters();
    let mut bytes = Vec::with_capacity(params.iter().map(|(_, m)| m.data.len() * 8).sum());
    let mut weights_manifest = Vec::with_capacity(params.len());
    for (name, matrix) in params {
        weights_manifest.push(WeightEntry { name, shape: [matrix.rows, matrix.cols] });
        for value in &matrix.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    let artifact = ModelArtifact {
        format: FORMAT.to_owned(),
        spec: head.spec.clone(),
        labels: Gesture::labels(head.num_classes()),
        weights_manifest,
    };

    let file = std::fs::File::create(&files.json)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &artifact)?;
    std::fs::write(&files.weights, bytes)?;
    Ok(files)
}

/// Rebuilds a head from a file pair written by `save_pair`.
pub fn load_pair(files: &ModelFiles) -> Result<ClassifierHead> {
    if !files.stems_match() {
        log::warn!("model files {:?} and {:?} do not share a name", files.json, files.weights);
    }
    let file = std::fs::File::open(&files.json)?;
    let artifact: ModelArtifact = serde_json::from_reader(std::io::BufReader::new(file))?;
    if artifact.format != FORMAT {
        return Err(GestureError::ModelStore(format!("unknown model format {:?}", artifact.format)));
    }
    artifact.spec.check_chain()?;
    let listed: Vec<(String, [usize; 2])> =
        artifact.weights_manifest.iter().map(|w| (w.name.clone(), w.shape)).collect();
    let described = artifact.spec.parameter_shapes();
    if listed != described {
        return Err(GestureError::ModelStore(format!("manifest lists {:?}, model has {:?}", listed, described)));
    }
    let expected = manifest_bytes(&artifact.weights_manifest)?;
    let bytes = std::fs::read(&files.weights)?;
    if bytes.len() != expected {
        return Err(GestureError::ModelStore(format!(
            "weights file has {} bytes, manifest describes {}", bytes.len(), expected
        )));
    }

    // Every parameter is overwritten below; the seed only fills the shapes.
    let mut head = ClassifierHead::new(artifact.spec, &mut StdRng::seed_from_u64(0));
    let mut offset = 0;
    for entry in &artifact.weights_manifest {
        let param = head
            .parameter_mut(&entry.name)
            .ok_or_else(|| GestureError::ModelStore(format!("unknown weight {:?}", entry.name)))?;
        if param.shape() != (entry.shape[0], entry.shape[1]) {
            return Err(GestureError::ModelStore(format!(
                "weight {:?} is {:?}, model expects {:?}", entry.name, entry.shape, param.shape()
            )));
        }
        for (value, chunk) in param.data.iter_mut().zip(bytes[offset..].chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *value = f64::from_le_bytes(raw);
        }
        offset += param.data.len() * 8;
    }
    head.validate()?;
    Ok(head)
}

/// Byte length of the weights file described by `manifest`.
fn manifest_bytes(manifest: &[WeightEntry]) -> Result<usize> {
    manifest.iter().try_fold(0usize, |total, w| {
        w.shape[0]
            .checked_mul(w.shape[1])
            .and_then(|n| n.checked_mul(8))
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| GestureError::ModelStore(format!("weight {:?} has impossible shape {:?}", w.name, w.shape)))
    })
}

/// Model persistence across the local key-value store, the download
/// directory and an optional bundled default.
pub struct ModelStore {
    kv: Box<dyn KeyValueStore>,
    model_name: String,
    download_dir: PathBuf,
    bundled: Option<PathBuf>,
}

impl ModelStore {
    pub fn new(config: &StorageConfig, kv: Box<dyn KeyValueStore>) -> ModelStore {
        ModelStore {
            kv,
            model_name: config.model_name.clone(),
            download_dir: config.download_dir.clone(),
            bundled: config.bundled_model.clone(),
        }
    }

    /// Writes the file pair and the local copy. Both are attempted; the
    /// first failure is returned.
    pub fn save(&mut self, head: &ClassifierHead) -> Result<ModelFiles> {
        let pair = save_pair(head, &self.download_dir, &self.model_name);
        let local = self.save_local(head);
        match (pair, local) {
            (Ok(files), Ok(())) => {
                log::info!("model saved to {:?} and the local store", files.json);
                Ok(files)
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }

    pub fn save_local(&mut self, head: &ClassifierHead) -> Result<()> {
        let json = serde_json::to_string(head)?;
        self.kv.set(&self.model_name, &json)
    }

    /// `Ok(None)` when nothing is stored locally.
    pub fn load_local(&self) -> Result<Option<ClassifierHead>> {
        match self.kv.get(&self.model_name)? {
            Some(json) => {
                let head: ClassifierHead = serde_json::from_str(&json)?;
                head.validate()?;
                Ok(Some(head))
            }
            None => Ok(None),
        }
    }

    /// `Ok(None)` when no bundled model is configured.
    pub fn load_bundled(&self) -> Result<Option<ClassifierHead>> {
        match &self.bundled {
            Some(json) => load_pair(&ModelFiles::beside(json)).map(Some),
            None => Ok(None),
        }
    }

    /// Tries the local store, then the bundled model, then `manual`. A model
    /// found anywhere but the local store is copied into it.
    pub fn load(&mut self, manual: Option<&ModelFiles>) -> Result<(ClassifierHead, ModelSource)> {
        let mut attempts = Vec::new();
        let order = [ModelSource::Local, ModelSource::Bundled, ModelSource::Manual];
        for source in order {
            match self.load_from(source, manual) {
                Ok(Some(head)) => {
                    self.adopt(&head, source);
                    return Ok((head, source));
                }
                Ok(None) => attempts.push(format!("{}: nothing there", source)),
                Err(e) => {
                    log::warn!("could not load model from {}: {}", source, e);
                    attempts.push(format!("{}: {}", source, e));
                }
            }
        }
        Err(GestureError::ModelUnavailable { attempts })
    }

    /// Start-up load: the bundled model first, then the local store.
    /// Failures are logged and yield `None`.
    pub fn preload(&mut self) -> Option<(ClassifierHead, ModelSource)> {
        for source in [ModelSource::Bundled, ModelSource::Local] {
            match self.load_from(source, None) {
                Ok(Some(head)) => {
                    self.adopt(&head, source);
                    return Some((head, source));
                }
                Ok(None) => {}
                Err(e) => log::warn!("preload from {} failed: {}", source, e),
            }
        }
        None
    }

    fn load_from(&self, source: ModelSource, manual: Option<&ModelFiles>) -> Result<Option<ClassifierHead>> {
        match source {
            ModelSource::Local => self.load_local(),
            ModelSource::Bundled => self.load_bundled(),
            ModelSource::Manual => manual.map(load_pair).transpose(),
        }
    }

    fn adopt(&mut self, head: &ClassifierHead, source: ModelSource) {
        log::info!("loaded {}-class model from {}", head.num_classes(), source);
        if source != ModelSource::Local {
            if let Err(e) = self.save_local(head) {
                log::warn!("could not cache model in the local store: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::math::matrix::Matrix;
    use crate::network::spec::LayerSpec;
    use crate::persist::kv::MemoryStore;

    fn head(seed: u64, classes: usize) -> ClassifierHead {
        let cfg = TrainingConfig { hidden: vec![5, 3], ..TrainingConfig::default() };
        ClassifierHead::new(HeadSpec::for_classes(4, classes, &cfg), &mut StdRng::seed_from_u64(seed))
    }

    fn same_predictions(a: &ClassifierHead, b: &ClassifierHead) -> bool {
        let x = Matrix::from_vec(1, 4, vec![0.3, -0.2, 0.9, 0.1]);
        a.predict(&x).unwrap() == b.predict(&x).unwrap()
    }

    fn storage(dir: &Path) -> StorageConfig {
        StorageConfig { download_dir: dir.join("downloads"), ..StorageConfig::default() }
    }

    #[test]
    fn file_pair_restores_the_head() {
        let dir = tempfile::tempdir().unwrap();
        let original = head(1, 6);
        let files = save_pair(&original, dir.path(), "my_model").unwrap();
        assert_eq!(files.weights.file_name().unwrap(), "my_model.weights.bin");

        let artifact: ModelArtifact =
            serde_json::from_str(&std::fs::read_to_string(&files.json).unwrap()).unwrap();
        assert_eq!(artifact.labels.last().map(String::as_str), Some("Custom"));
        assert_eq!(artifact.weights_manifest[0], WeightEntry { name: "dense_0/kernel".into(), shape: [4, 5] });

        let loaded = load_pair(&files).unwrap();
        assert_eq!(loaded.num_classes(), 6);
        assert!(same_predictions(&original, &loaded));
    }

    #[test]
    fn truncated_weights_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let files = save_pair(&head(2, 5), dir.path(), "m").unwrap();
        let bytes = std::fs::read(&files.weights).unwrap();
        std::fs::write(&files.weights, &bytes[..bytes.len() - 8]).unwrap();
        assert!(matches!(load_pair(&files), Err(GestureError::ModelStore(_))));
    }

    #[test]
    fn load_prefers_local_then_falls_back_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ModelStore::new(&storage(dir.path()), Box::new(MemoryStore::new()));

        let err = store.load(None).unwrap_err();
        match err {
            GestureError::ModelUnavailable { attempts } => assert_eq!(attempts.len(), 3),
            other => panic!("unexpected error {:?}", other),
        }

        let manual_head = head(3, 5);
        let files = save_pair(&manual_head, dir.path(), "upload").unwrap();
        let (loaded, source) = store.load(Some(&files)).unwrap();
        assert_eq!(source, ModelSource::Manual);
        assert!(same_predictions(&manual_head, &loaded));

        // Written back, so the local store now wins.
        let (cached, source) = store.load(None).unwrap();
        assert_eq!(source, ModelSource::Local);
        assert!(same_predictions(&manual_head, &cached));
    }

    #[test]
    fn preload_prefers_the_bundled_model() {
        let dir = tempfile::tempdir().unwrap();
        let bundled = head(4, 5);
        let files = save_pair(&bundled, dir.path(), "bundled").unwrap();
        let config = StorageConfig { bundled_model: Some(files.json.clone()), ..storage(dir.path()) };
        let mut store = ModelStore::new(&config, Box::new(MemoryStore::new()));
        store.save_local(&head(5, 5)).unwrap();

        let (loaded, source) = store.preload().unwrap();
        assert_eq!(source, ModelSource::Bundled);
        assert!(same_predictions(&bundled, &loaded));
        assert!(same_predictions(&bundled, &store.load_local().unwrap().unwrap()));
    }

    #[test]
    fn save_writes_both_targets() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ModelStore::new(&storage(dir.path()), Box::new(MemoryStore::new()));
        let h = head(6, 5);
        let files = store.save(&h).unwrap();
        assert!(files.json.exists() && files.weights.exists());
        assert!(store.load_local().unwrap().is_some());
    }

    fn rewrite_artifact(files: &ModelFiles, edit: impl FnOnce(&mut ModelArtifact)) {
        let mut artifact: ModelArtifact =
            serde_json::from_str(&std::fs::read_to_string(&files.json).unwrap()).unwrap();
        edit(&mut artifact);
        std::fs::write(&files.json, serde_json::to_string(&artifact).unwrap()).unwrap();
    }

    #[test]
    fn overflowing_manifest_is_an_error() {
        let huge = WeightEntry { name: "dense_0/kernel".into(), shape: [1 << 62, 4] };
        assert!(matches!(manifest_bytes(&[huge.clone()]), Err(GestureError::ModelStore(_))));

        let dir = tempfile::tempdir().unwrap();
        let files = save_pair(&head(7, 5), dir.path(), "m").unwrap();
        rewrite_artifact(&files, |a| a.weights_manifest[0] = huge);
        assert!(matches!(load_pair(&files), Err(GestureError::ModelStore(_))));
    }

    #[test]
    fn oversized_spec_is_rejected_before_building() {
        let dir = tempfile::tempdir().unwrap();
        let files = save_pair(&head(8, 5), dir.path(), "m").unwrap();
        rewrite_artifact(&files, |a| {
            a.spec.input_size = 1 << 40;
            if let LayerSpec::Dense { input_size, .. } = &mut a.spec.layers[0] {
                *input_size = 1 << 40;
            }
            a.weights_manifest[0].shape[0] = 1 << 40;
        });
        let err = load_pair(&files).unwrap_err();
        assert!(matches!(err, GestureError::ModelStore(ref m) if m.contains("bytes")), "{}", err);
    }

    #[test]
    fn unchained_layers_do_not_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = head(9, 5).spec;
        if let LayerSpec::Dense { input_size, .. } = &mut spec.layers[2] {
            *input_size = 7;
        }
        let broken = ClassifierHead::new(spec, &mut StdRng::seed_from_u64(9));
        let files = save_pair(&broken, dir.path(), "broken").unwrap();
        assert!(matches!(load_pair(&files), Err(GestureError::ModelStore(_))));

        let mut store = ModelStore::new(&storage(dir.path()), Box::new(MemoryStore::new()));
        store.save_local(&broken).unwrap();
        assert!(store.load_local().is_err());
    }
}
