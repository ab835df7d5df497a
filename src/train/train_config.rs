use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use crate::config::TrainingConfig;
use crate::train::epoch_stats::TrainEvent;

/// Configuration for a single `train_loop` run.
///
/// # Fields
/// - `epochs`     : effective epoch budget (boost already applied)
/// - `batch_size` : samples per mini-batch
/// - `progress_tx`: optional channel sender for `TrainEvent`s. If the
///                   receiver is dropped the loop stops after the current epoch.
/// - `stop_flag`  : optional atomic flag; when set to `true` from another
///                   thread the loop terminates at the next epoch boundary.
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Epochs without loss improvement before early stopping may fire.
    pub patience: usize,
    /// Early stopping additionally requires accuracy above this.
    pub min_stop_accuracy: f64,
    pub progress_tx: Option<mpsc::Sender<TrainEvent>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with no progress channel and no stop flag.
    pub fn new(epochs: usize, batch_size: usize, training: &TrainingConfig) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            learning_rate: training.learning_rate,
            patience: training.patience,
            min_stop_accuracy: training.min_stop_accuracy,
            progress_tx: None,
            stop_flag: None,
        }
    }
}

/// `min(max_batch, floor(examples / 2))`. Zero when fewer than two examples.
pub fn batch_size_for(examples: usize, max_batch: usize) -> usize {
    max_batch.min(examples / 2)
}
