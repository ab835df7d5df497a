pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;
pub mod dataset;
pub mod inference;
pub mod game;
pub mod vision;
pub mod persist;
pub mod session;
pub mod config;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use network::{ClassifierHead, HeadSpec, LayerSpec, ModelMetadata};
pub use loss::cross_entropy::CrossEntropyLoss;
pub use optim::adam::Adam;
pub use train::{ClassifierTrainer, EarlyStopping, EpochStats, TrainConfig, TrainEvent, TrainingJob, TrainingReport, TrainingStats, train_loop};
pub use dataset::{DatasetExport, ExampleStore};
pub use inference::{InferenceLoop, Prediction, PredictionSmoother, TickOutcome};
pub use game::{resolve, GameTable, Gesture, Leaderboard, Outcome, Round, ScoreState};
pub use vision::{Frame, FeatureExtractor, HandDetector, PooledPixelExtractor, ReportedHands};
pub use persist::{FileStore, KeyValueStore, MemoryStore, ModelFiles, ModelSource, ModelStore};
pub use session::{GestureSession, SampleReport, SessionSnapshot, Status, DATASET_FILE};
pub use config::GestureConfig;
pub use error::{ErrorKind, GestureError, Result};
