use std::sync::atomic::Ordering;
use std::time::Instant;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{GestureError, Result};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::math::matrix::Matrix;
use crate::network::network::ClassifierHead;
use crate::optim::adam::Adam;
use crate::train::early_stop::EarlyStopping;
use crate::train::epoch_stats::{EpochStats, TrainEvent, TrainingStats};
use crate::train::train_config::TrainConfig;

/// How a `train_loop` run ended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainOutcome {
    /// Metrics of the last completed epoch; `None` if no epoch ran.
    pub stats: Option<TrainingStats>,
    pub epochs_run: usize,
    pub early_stopped: bool,
    /// Stopped by the stop flag or a dropped progress receiver.
    pub cancelled: bool,
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `head` on `(xs, ys)` for up to `config.epochs` epochs with a fresh
/// Adam optimizer.
///
/// # Arguments
/// - `head`  : classifier head; modified in place
/// - `xs`    : `(examples, input_size)` embeddings
/// - `ys`    : `(examples, num_classes)` one-hot labels
/// - `config`: hyperparameters, optional progress channel, optional stop flag
/// - `rng`   : drives shuffling and dropout masks
///
/// # Early termination
/// The loop ends before the epoch budget if:
/// - the early-stopping guard fires, **or**
/// - `config.stop_flag` is set, **or**
/// - the `progress_tx` receiver has been dropped.
///
/// # Errors
/// Shape mismatches, an empty dataset, a zero batch size and non-finite
/// losses are reported as `TrainingFailed`; the head may have been partially
/// updated in the last case.
pub fn train_loop<R: Rng + ?Sized>(
    head: &mut ClassifierHead,
    xs: &Matrix,
    ys: &Matrix,
    config: &TrainConfig,
    rng: &mut R,
) -> Result<TrainOutcome> {
    check_inputs(head, xs, ys, config)?;

    let mut optimizer = Adam::new(config.learning_rate);
    let mut guard = EarlyStopping::new(config.patience, config.min_stop_accuracy);
    let mut outcome = TrainOutcome::default();

    for epoch in 1..=config.epochs {
        if stop_requested(config) {
            outcome.cancelled = true;
            break;
        }

        let t_start = Instant::now();
        let (stats, receiver_gone) = run_one_epoch(head, xs, ys, &mut optimizer, config, epoch, rng)?;
        let elapsed_ms = t_start.elapsed().as_millis() as u64;

        log::debug!(
            "epoch {}/{}: loss {:.5}, accuracy {:.2}%",
            epoch, config.epochs, stats.loss, stats.accuracy * 100.0
        );
        outcome.stats = Some(stats);
        outcome.epochs_run = epoch;

        let epoch_stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            loss: stats.loss,
            accuracy: stats.accuracy,
            elapsed_ms,
        };
        if receiver_gone || !emit(config, TrainEvent::Epoch(epoch_stats)) {
            outcome.cancelled = true;
            break;
        }

        if guard.observe(stats.loss, stats.accuracy) {
            log::info!("early stopping at epoch {}", epoch);
            emit(config, TrainEvent::EarlyStopped { epoch });
            outcome.early_stopped = true;
            break;
        }
    }

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn check_inputs(head: &ClassifierHead, xs: &Matrix, ys: &Matrix, config: &TrainConfig) -> Result<()> {
    let fail = |why: String| Err(GestureError::TrainingFailed(why));
    if xs.rows == 0 {
        return fail("no training examples".into());
    }
    if xs.rows != ys.rows {
        return fail(format!("{} embeddings but {} labels", xs.rows, ys.rows));
    }
    if xs.cols != head.input_size() {
        return fail(format!("embeddings have {} values, head expects {}", xs.cols, head.input_size()));
    }
    if ys.cols != head.num_classes() {
        return fail(format!("labels encode {} classes, head has {}", ys.cols, head.num_classes()));
    }
    if config.batch_size == 0 {
        return fail("batch size is zero".into());
    }
    Ok(())
}

fn stop_requested(config: &TrainConfig) -> bool {
    config.stop_flag.as_ref().map_or(false, |flag| flag.load(Ordering::Relaxed))
}

/// Sends `event` if a channel is configured. Returns `false` once the
/// receiver has been dropped.
fn emit(config: &TrainConfig, event: TrainEvent) -> bool {
    match config.progress_tx {
        Some(ref tx) => tx.send(event).is_ok(),
        None => true,
    }
}

/// One shuffled pass of mini-batch Adam. Returns the epoch's metrics and
/// whether the progress receiver went away during the epoch.
fn run_one_epoch<R: Rng + ?Sized>(
    head: &mut ClassifierHead,
    xs: &Matrix,
    ys: &Matrix,
    optimizer: &mut Adam,
    config: &TrainConfig,
    epoch: usize,
    rng: &mut R,
) -> Result<(TrainingStats, bool)> {
    let n = xs.rows;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    let total_batches = (n + config.batch_size - 1) / config.batch_size;
    let mut weighted_loss = 0.0;
    let mut correct = 0usize;
    let mut receiver_gone = false;

    for (batch, chunk) in indices.chunks(config.batch_size).enumerate() {
        let batch_xs = xs.select_rows(chunk);
        let batch_ys = ys.select_rows(chunk);

        let output = head.forward_train(&batch_xs, rng);
        let loss = CrossEntropyLoss::batch_loss(&output, &batch_ys) + head.l2_penalty();
        if !loss.is_finite() {
            return Err(GestureError::TrainingFailed(format!(
                "loss became non-finite in epoch {} batch {}", epoch, batch
            )));
        }
        weighted_loss += loss * chunk.len() as f64;
        correct += (0..output.rows)
            .filter(|&r| output.row_argmax(r) == batch_ys.row_argmax(r))
            .count();

        let grads = head.backward(&CrossEntropyLoss::batch_derivative(&output, &batch_ys));
        head.apply_gradients(&grads, optimizer);

        let progress = ((epoch - 1) as f64 + (batch + 1) as f64 / total_batches as f64) / config.epochs as f64;
        if !receiver_gone {
            receiver_gone = !emit(config, TrainEvent::Batch { epoch, batch, total_batches, progress, loss });
        }
    }

    let stats = TrainingStats { loss: weighted_loss / n as f64, accuracy: correct as f64 / n as f64 };
    Ok((stats, receiver_gone))
}
