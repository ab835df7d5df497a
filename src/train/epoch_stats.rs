use serde::{Serialize, Deserialize};

/// Scalar metrics of the latest completed epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Mean cross-entropy plus the L2 penalty.
    pub loss: f64,
    /// Training accuracy as a fraction in [0, 1].
    pub accuracy: f64,
}

/// Per-epoch statistics emitted by `train_loop`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Effective epoch budget of this run (after boost).
    pub total_epochs: usize,
    pub loss: f64,
    pub accuracy: f64,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

impl EpochStats {
    pub fn stats(&self) -> TrainingStats {
        TrainingStats { loss: self.loss, accuracy: self.accuracy }
    }
}

/// Progress events of a training run, in emission order.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the loop sends
/// a `Batch` event after every mini-batch, an `Epoch` event after every epoch
/// and `EarlyStopped` if the early-stopping guard ends the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrainEvent {
    Batch {
        /// 1-based epoch number.
        epoch: usize,
        /// 0-based batch index within the epoch.
        batch: usize,
        total_batches: usize,
        /// Fraction of the whole run completed, in [0, 1].
        progress: f64,
        loss: f64,
    },
    Epoch(EpochStats),
    EarlyStopped { epoch: usize },
}
