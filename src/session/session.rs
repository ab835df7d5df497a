use std::path::PathBuf;
use std::time::Instant;

use rand::{rngs::StdRng, SeedableRng};

use crate::config::GestureConfig;
use crate::dataset::export::DatasetExport;
use crate::dataset::store::ExampleStore;
use crate::error::{ErrorKind, GestureError, Result};
use crate::game::gesture::{Gesture, BASE_CLASSES, EXTENDED_CLASSES};
use crate::game::modes::GameTable;
use crate::inference::loop_fn::{InferenceLoop, TickOutcome};
use crate::network::network::ClassifierHead;
use crate::persist::kv::{FileStore, KeyValueStore};
use crate::persist::model_store::{ModelFiles, ModelSource, ModelStore};
use crate::session::status::{SampleReport, SessionSnapshot, Status};
use crate::train::loop_fn::TrainOutcome;
use crate::train::trainer::{ClassifierTrainer, TrainingJob, TrainingReport};
use crate::vision::extractor::FeatureExtractor;
use crate::vision::hands::HandDetector;
use crate::vision::Frame;

/// File name of `save_dataset` exports.
pub const DATASET_FILE: &str = "rpsls_dataset.json";

/// Hands tracked while multiplayer is on.
const MULTIPLAYER_HANDS: usize = 2;

/// All state of one gesture-game session, and the operations front-ends
/// trigger on it.
///
/// Every operation is an error boundary: it returns the error to the caller,
/// logs it, and moves the status to `Error` unless the error was a failed
/// precondition (which leaves the session untouched).
pub struct GestureSession {
    config: GestureConfig,
    store: ExampleStore,
    trainer: ClassifierTrainer,
    extractor: Box<dyn FeatureExtractor>,
    detector: Box<dyn HandDetector>,
    table: GameTable,
    inference: InferenceLoop,
    models: ModelStore,
    boost: bool,
    training: bool,
    status: Status,
    last_error: Option<String>,
}

impl GestureSession {
    pub fn new(
        config: GestureConfig,
        extractor: Box<dyn FeatureExtractor>,
        detector: Box<dyn HandDetector>,
        game_store: Box<dyn KeyValueStore>,
        model_store: Box<dyn KeyValueStore>,
    ) -> GestureSession {
        let game_rng = match config.training.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        let mut detector = detector;
        detector.set_max_hands(config.vision.max_hands);
        GestureSession {
            store: ExampleStore::new(extractor.output_shape()),
            trainer: ClassifierTrainer::new(config.training.clone()),
            extractor,
            detector,
            table: GameTable::new(&config.game, game_store, game_rng),
            inference: InferenceLoop::new(&config.inference),
            models: ModelStore::new(&config.storage, model_store),
            boost: false,
            training: false,
            status: Status::Initializing,
            last_error: None,
            config,
        }
    }

    /// Session backed by files under `storage.data_dir`.
    pub fn open(
        config: GestureConfig,
        extractor: Box<dyn FeatureExtractor>,
        detector: Box<dyn HandDetector>,
    ) -> Result<GestureSession> {
        let files = FileStore::open(&config.storage.data_dir)?;
        Ok(GestureSession::new(config, extractor, detector, Box::new(files.clone()), Box::new(files)))
    }

    /// Preloads a model if one is available and marks the session ready.
    pub fn initialize(&mut self) -> Option<ModelSource> {
        self.status = Status::Loading;
        let source = self.preload_model();
        if self.status == Status::Loading {
            self.status = Status::Ready;
        }
        source
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn head(&self) -> Option<&ClassifierHead> {
        self.trainer.head()
    }

    pub fn examples(&self) -> &ExampleStore {
        &self.store
    }

    pub fn table(&self) -> &GameTable {
        &self.table
    }

    pub fn is_predicting(&self) -> bool {
        self.inference.is_predicting()
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    /// 6 once a custom gesture was collected or multiplayer is on, else 5.
    pub fn num_classes(&self) -> usize {
        if self.table.multiplayer || self.store.count(Gesture::Custom.index()) > 0 {
            EXTENDED_CLASSES
        } else {
            BASE_CLASSES
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            status_text: self.status.text(),
            last_error: self.last_error.clone(),
            has_model: self.trainer.head().is_some(),
            num_classes: self.num_classes(),
            training: self.training,
            predicting: self.inference.is_predicting(),
            loop_state: self.inference.state(),
            boost: self.boost,
            multiplayer: self.table.multiplayer,
            speed_remaining: self.table.speed_remaining(),
            samples: SampleReport::from_labels(self.store.labels()),
            stats: self.trainer.stats(),
            current: self.inference.current(),
            history: self.inference.history(),
            scores: self.table.scores,
            leaderboard: self.table.leaderboard.entries().to_vec(),
        }
    }

    // -----------------------------------------------------------------------
    // Collection
    // -----------------------------------------------------------------------

    /// Embeds `frame` and stores it as an example of `gesture`.
    pub fn add_sample(&mut self, frame: &Frame, gesture: Gesture) -> Result<SampleReport> {
        let result = self.extractor.embed(frame).and_then(|e| self.store.add_example(e, gesture.index()));
        self.boundary("add sample", result)?;
        Ok(SampleReport::from_labels(self.store.labels()))
    }

    /// Stores an already computed embedding.
    pub fn add_embedding(&mut self, embedding: Vec<f64>, gesture: Gesture) -> Result<SampleReport> {
        let result = self.store.add_example(embedding, gesture.index());
        self.boundary("add sample", result)?;
        Ok(SampleReport::from_labels(self.store.labels()))
    }

    // -----------------------------------------------------------------------
    // Training
    // -----------------------------------------------------------------------

    /// Validates preconditions, encodes the labels and hands out a training
    /// run for `epochs` (doubled in boost mode). Finish it with
    /// `finish_training`.
    pub fn begin_training(&mut self, epochs: usize) -> Result<TrainingJob> {
        let result = self.prepare_training(epochs);
        self.boundary("train", result)
    }

    /// Short run reusing the current head.
    pub fn begin_fine_tune(&mut self) -> Result<TrainingJob> {
        let result = if self.trainer.head().is_none() {
            Err(GestureError::ModelMissing)
        } else {
            self.prepare_training(self.config.training.fine_tune_epochs)
        };
        self.boundary("add more samples", result)
    }

    fn prepare_training(&mut self, epochs: usize) -> Result<TrainingJob> {
        if self.training {
            return Err(GestureError::TrainingInProgress);
        }
        let required = self.config.training.min_samples;
        if self.store.len() < required {
            return Err(GestureError::InsufficientSamples { required, actual: self.store.len() });
        }
        let num_classes = self.num_classes();
        self.store.encode_labels(num_classes)?;
        let job = self.trainer.prepare(&self.store, epochs, self.boost)?;
        self.training = true;
        self.status = Status::Training;
        Ok(job)
    }

    /// Returns the trained head to the session and records the metrics.
    pub fn finish_training(&mut self, report: TrainingReport) -> Result<TrainOutcome> {
        self.training = false;
        let result = self.trainer.finish(report);
        if let Ok(outcome) = &result {
            self.status = if self.inference.is_predicting() { Status::Predicting } else { Status::Ready };
            self.last_error = None;
            if let Some(stats) = outcome.stats {
                log::info!("model stats: accuracy {:.2}%, loss {:.5}", stats.accuracy * 100.0, stats.loss);
            }
        }
        self.boundary("train", result)
    }

    /// Trains on the calling thread.
    pub fn train(&mut self, epochs: usize) -> Result<TrainOutcome> {
        let job = self.begin_training(epochs)?;
        self.finish_training(job.run())
    }

    /// Fine-tunes on the calling thread.
    pub fn add_more_samples(&mut self) -> Result<TrainOutcome> {
        let job = self.begin_fine_tune()?;
        self.finish_training(job.run())
    }

    pub fn toggle_boost(&mut self) -> bool {
        self.boost = !self.boost;
        log::info!("boost mode {}", if self.boost { "on" } else { "off" });
        self.boost
    }

    // -----------------------------------------------------------------------
    // Prediction and game modes
    // -----------------------------------------------------------------------

    pub fn start_predicting(&mut self) -> Result<()> {
        let result = if self.training {
            Err(GestureError::TrainingInProgress)
        } else if self.trainer.head().is_none() {
            Err(GestureError::ModelMissing)
        } else {
            self.inference.start();
            self.status = Status::Predicting;
            Ok(())
        };
        self.boundary("start predicting", result)
    }

    /// Stops the loop and any running speed challenge.
    pub fn stop_predicting(&mut self) {
        self.inference.stop();
        self.table.cancel_speed_challenge();
        if self.status == Status::Predicting {
            self.status = Status::Ready;
        }
    }

    /// Runs one inference tick on `frame`.
    pub fn tick(&mut self, frame: &Frame, now: Instant) -> Result<TickOutcome> {
        let result = match self.trainer.head() {
            Some(head) => self.inference.tick(
                frame,
                now,
                head,
                self.extractor.as_ref(),
                self.detector.as_mut(),
                &mut self.table,
            ),
            None if !self.inference.is_predicting() => Ok(TickOutcome::Stopped),
            None if self.training => Err(GestureError::TrainingInProgress),
            None => {
                self.inference.stop();
                Err(GestureError::ModelMissing)
            }
        };
        self.boundary("predict", result)
    }

    pub fn toggle_multiplayer(&mut self) -> bool {
        self.table.multiplayer = !self.table.multiplayer;
        let hands = if self.table.multiplayer { MULTIPLAYER_HANDS } else { self.config.vision.max_hands };
        self.detector.set_max_hands(hands);
        log::info!("multiplayer {}", if self.table.multiplayer { "on" } else { "off" });
        self.table.multiplayer
    }

    /// Starts the timed sequence and, if needed, prediction.
    pub fn start_speed_challenge(&mut self, now: Instant) -> Result<()> {
        if self.trainer.head().is_none() {
            return self.boundary("speed challenge", Err(GestureError::ModelMissing));
        }
        self.table.start_speed_challenge(now);
        if !self.inference.is_predicting() {
            self.start_predicting()?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Saves the head as a file pair and into the local store.
    pub fn save_model(&mut self) -> Result<ModelFiles> {
        let result = match self.trainer.head() {
            Some(head) => self.models.save(head),
            None => Err(GestureError::ModelMissing),
        };
        self.boundary("save model", result)
    }

    /// Loads from the local store, the bundled model or `manual`, in that order.
    pub fn load_model(&mut self, manual: Option<&ModelFiles>) -> Result<ModelSource> {
        if self.training {
            return self.boundary("load model", Err(GestureError::TrainingInProgress));
        }
        let previous = self.status;
        self.status = Status::Loading;
        let result = self.models.load(manual).and_then(|(head, source)| {
            self.install_head(head)?;
            Ok(source)
        });
        if result.is_ok() {
            self.status = if previous == Status::Predicting { previous } else { Status::Ready };
            self.last_error = None;
        }
        self.boundary("load model", result)
    }

    /// Start-up load: bundled model first, then the local store.
    pub fn preload_model(&mut self) -> Option<ModelSource> {
        let (head, source) = self.models.preload()?;
        match self.install_head(head) {
            Ok(()) => Some(source),
            Err(e) => {
                log::warn!("ignoring preloaded model: {}", e);
                None
            }
        }
    }

    fn install_head(&mut self, head: ClassifierHead) -> Result<()> {
        let expected = self.store.shape().flat_len();
        if head.input_size() != expected {
            return Err(GestureError::ShapeMismatch { expected, got: head.input_size() });
        }
        self.trainer.set_head(head);
        Ok(())
    }

    /// Embeddings and one-hot labels of the last encoded dataset.
    pub fn export_dataset(&mut self) -> Result<DatasetExport> {
        let result = DatasetExport::from_store(&self.store);
        self.boundary("export dataset", result)
    }

    /// Writes `export_dataset` to the download directory.
    pub fn save_dataset(&mut self) -> Result<PathBuf> {
        let dir = self.config.storage.download_dir.clone();
        let result = DatasetExport::from_store(&self.store).and_then(|export| {
            std::fs::create_dir_all(&dir)?;
            let path = dir.join(DATASET_FILE);
            export.save_json(&path)?;
            Ok(path)
        });
        self.boundary("save dataset", result)
    }

    // -----------------------------------------------------------------------
    // Error boundary
    // -----------------------------------------------------------------------

    fn boundary<T>(&mut self, operation: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            match e.kind() {
                ErrorKind::Precondition => log::warn!("{}: {}", operation, e),
                ErrorKind::ExternalResource | ErrorKind::Computation => {
                    log::error!("{} failed: {}", operation, e);
                    self.status = Status::Error;
                    self.last_error = Some(e.to_string());
                }
            }
        }
        result
    }
}
