use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::TrainingConfig;
use crate::dataset::store::ExampleStore;
use crate::error::{GestureError, Result};
use crate::game::gesture::Gesture;
use crate::math::matrix::Matrix;
use crate::network::metadata::ModelMetadata;
use crate::network::network::ClassifierHead;
use crate::network::spec::HeadSpec;
use crate::train::epoch_stats::{TrainEvent, TrainingStats};
use crate::train::loop_fn::{train_loop, TrainOutcome};
use crate::train::train_config::{batch_size_for, TrainConfig};
use crate::vision::extractor::EmbeddingShape;

/// Owns the classifier head and runs training against an `ExampleStore`.
///
/// The head is created lazily on the first run and reused by later runs as
/// long as the class count is unchanged.
pub struct ClassifierTrainer {
    config: TrainingConfig,
    head: Option<ClassifierHead>,
    stats: Option<TrainingStats>,
    rng: StdRng,
}

impl ClassifierTrainer {
    pub fn new(config: TrainingConfig) -> ClassifierTrainer {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        ClassifierTrainer { config, head: None, stats: None, rng }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn head(&self) -> Option<&ClassifierHead> {
        self.head.as_ref()
    }

    /// Installs a loaded head, replacing any current one.
    pub fn set_head(&mut self, head: ClassifierHead) {
        self.head = Some(head);
    }

    /// Metrics of the latest completed epoch of the latest run.
    pub fn stats(&self) -> Option<TrainingStats> {
        self.stats
    }

    /// Epoch budget after applying boost mode.
    pub fn effective_epochs(epochs: usize, boost: bool) -> usize {
        if boost { epochs * 2 } else { epochs }
    }

    /// Returns the head for `num_classes`, building it if absent. A head with
    /// a different class count is discarded and rebuilt.
    pub fn ensure_head(&mut self, shape: EmbeddingShape, num_classes: usize) -> &mut ClassifierHead {
        let input_size = shape.flat_len();
        match self.head.take() {
            Some(head) if head.num_classes() == num_classes && head.input_size() == input_size => {
                self.head.insert(head)
            }
            previous => {
                if let Some(old) = previous {
                    log::warn!(
                        "discarding {}-class head, rebuilding for {} classes",
                        old.num_classes(), num_classes
                    );
                }
                let spec = HeadSpec::for_classes(input_size, num_classes, &self.config).with_metadata(ModelMetadata {
                    description: Some("few-shot gesture classifier head".into()),
                    input_shape: Some(shape),
                    output_labels: Some(Gesture::labels(num_classes)),
                });
                self.head.insert(ClassifierHead::new(spec, &mut self.rng))
            }
        }
    }

    /// Prepares a run over the store's current contents. The store must have
    /// been encoded for the class count to train; the head is taken out of
    /// the trainer until `finish` returns it.
    pub fn prepare(&mut self, store: &ExampleStore, epochs: usize, boost: bool) -> Result<TrainingJob> {
        let ys = store.encoded().ok_or(GestureError::DatasetNotEncoded)?.clone();
        let batch_size = batch_size_for(store.len(), self.config.max_batch_size);
        if batch_size == 0 {
            return Err(GestureError::InsufficientSamples { required: 2, actual: store.len() });
        }
        let shape = store.shape();
        let had_head = self
            .head
            .as_ref()
            .map_or(false, |h| h.num_classes() == ys.cols && h.input_size() == shape.flat_len());
        let head = self.ensure_head(shape, ys.cols).clone();
        let fallback = if had_head { self.head.take() } else { None };
        self.head = None;

        let epochs = ClassifierTrainer::effective_epochs(epochs, boost);
        log::info!(
            "training {}-class head on {} examples: {} epochs, batch size {}",
            ys.cols, store.len(), epochs, batch_size
        );
        Ok(TrainingJob {
            head,
            fallback,
            xs: store.xs(),
            ys,
            config: TrainConfig::new(epochs, batch_size, &self.config),
            rng: StdRng::seed_from_u64(self.rng.gen()),
        })
    }

    /// Takes back the head of a finished job. A failed run restores the head
    /// the job started from (or none, if it started fresh).
    pub fn finish(&mut self, report: TrainingReport) -> Result<TrainOutcome> {
        match report.result {
            Ok(outcome) => {
                self.head = Some(report.head);
                if outcome.stats.is_some() {
                    self.stats = outcome.stats;
                }
                Ok(outcome)
            }
            Err(e) => {
                self.head = report.fallback;
                Err(e)
            }
        }
    }

    /// Prepares, runs and finishes a run on the calling thread.
    pub fn fit(&mut self, store: &ExampleStore, epochs: usize, boost: bool) -> Result<TrainOutcome> {
        let job = self.prepare(store, epochs, boost)?;
        self.finish(job.run())
    }
}

/// A self-contained training run that can be moved to a worker thread.
pub struct TrainingJob {
    head: ClassifierHead,
    fallback: Option<ClassifierHead>,
    xs: Matrix,
    ys: Matrix,
    config: TrainConfig,
    rng: StdRng,
}

impl TrainingJob {
    pub fn epochs(&self) -> usize {
        self.config.epochs
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<TrainEvent>) -> TrainingJob {
        self.config.progress_tx = Some(tx);
        self
    }

    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> TrainingJob {
        self.config.stop_flag = Some(flag);
        self
    }

    pub fn run(mut self) -> TrainingReport {
        let result = train_loop(&mut self.head, &self.xs, &self.ys, &self.config, &mut self.rng);
        match &result {
            Ok(outcome) => log::info!(
                "training finished after {} epochs (early stop: {}, cancelled: {})",
                outcome.epochs_run, outcome.early_stopped, outcome.cancelled
            ),
            Err(e) => log::error!("training failed: {}", e),
        }
        TrainingReport { head: self.head, fallback: self.fallback, result }
    }
}

/// What a `TrainingJob` hands back to `ClassifierTrainer::finish`.
pub struct TrainingReport {
    head: ClassifierHead,
    fallback: Option<ClassifierHead>,
    pub result: Result<TrainOutcome>,
}
