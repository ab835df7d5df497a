use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::error::Result;

/// Top-level configuration, persisted as JSON.
///
/// Every section falls back to its defaults when missing, so a config file
/// only needs the keys it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub training: TrainingConfig,
    pub inference: InferenceConfig,
    pub game: GameConfig,
    pub storage: StorageConfig,
    pub vision: VisionConfig,
}

impl GestureConfig {
    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a config from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<GestureConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Classifier-head architecture and training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Nominal epoch budget of a full training run (doubled in boost mode).
    pub epochs: usize,
    /// Epoch budget of an "add more samples" fine-tuning run.
    pub fine_tune_epochs: usize,
    pub learning_rate: f64,
    /// L2 coefficient on the hidden-layer kernels.
    pub l2: f64,
    /// Units per hidden ReLU layer.
    pub hidden: Vec<usize>,
    /// Dropout rate after each hidden layer; paired with `hidden` by index.
    pub dropout: Vec<f64>,
    pub max_batch_size: usize,
    /// Epochs without loss improvement before early stopping may fire.
    pub patience: usize,
    /// Early stopping only fires once epoch accuracy exceeds this.
    pub min_stop_accuracy: f64,
    /// Minimum stored examples before training is allowed.
    pub min_samples: usize,
    /// Fixed RNG seed for weight init, shuffling and dropout.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 10,
            fine_tune_epochs: 3,
            learning_rate: 1e-4,
            l2: 0.001,
            hidden: vec![128, 64],
            dropout: vec![0.4, 0.3],
            max_batch_size: 32,
            patience: 3,
            min_stop_accuracy: 0.85,
            min_samples: 5,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Classify on every n-th tick.
    pub frame_skip: u64,
    /// Delay before the classifier is re-armed after a classification tick.
    pub throttle_ms: u64,
    /// Number of distinct recent gestures kept in the prediction history.
    pub history_len: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig { frame_skip: 2, throttle_ms: 50, history_len: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub player_name: String,
    pub leaderboard_size: usize,
    /// Key of the leaderboard in the durable key-value store.
    pub leaderboard_key: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            player_name: "Player".into(),
            leaderboard_size: 5,
            leaderboard_key: "rpslsLeaderboard".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the durable key-value store (models, leaderboard).
    pub data_dir: PathBuf,
    /// Where saved model file pairs and dataset exports are written.
    pub download_dir: PathBuf,
    /// File stem / store key of the saved model.
    pub model_name: String,
    /// Model file pair shipped with the application, if any (`<stem>.json`).
    pub bundled_model: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: PathBuf::from("gesture_data"),
            download_dir: PathBuf::from("trained_models"),
            model_name: "my_model".into(),
            bundled_model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Side length frames are resized to before feature extraction.
    pub input_size: u32,
    /// Pooling grid of the built-in extractor (`grid × grid × 3` embedding).
    pub grid: u32,
    /// Hands tracked simultaneously when multiplayer is off.
    pub max_hands: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        VisionConfig { input_size: 224, grid: 7, max_hands: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: GestureConfig =
            serde_json::from_str(r#"{ "training": { "epochs": 4 }, "game": { "player_name": "Ada" } }"#).unwrap();
        assert_eq!(cfg.training.epochs, 4);
        assert_eq!(cfg.training.hidden, vec![128, 64]);
        assert_eq!(cfg.game.player_name, "Ada");
        assert_eq!(cfg.game.leaderboard_size, 5);
        assert_eq!(cfg.inference.throttle_ms, 50);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut cfg = GestureConfig::default();
        cfg.training.seed = Some(42);
        cfg.save_json(&path).unwrap();
        let loaded = GestureConfig::load_json(&path).unwrap();
        assert_eq!(loaded.training.seed, Some(42));
        assert_eq!(loaded.storage.model_name, "my_model");
    }
}
