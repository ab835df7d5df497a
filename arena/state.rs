use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use ferrite_gesture::train::TrainOutcome;
use ferrite_gesture::{EpochStats, GestureSession, SessionSnapshot, TrainEvent};

// ---------------------------------------------------------------------------
// Training status
// ---------------------------------------------------------------------------

pub enum TrainingStatus {
    /// No background run has been started yet.
    Idle,
    /// A `TrainingJob` is running on its own thread.
    Running {
        stop_flag: Arc<AtomicBool>,
        event_rx: Arc<Mutex<mpsc::Receiver<TrainEvent>>>,
        total_epochs: usize,
    },
    /// The run ended and its head was handed back to the session.
    /// `was_stopped` is true when `/train/stop` ended it early.
    Done {
        epochs_run: usize,
        early_stopped: bool,
        was_stopped: bool,
        elapsed_total_ms: u64,
    },
    Failed {
        reason: String,
    },
}

impl TrainingStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, TrainingStatus::Running { .. })
    }

    pub fn finished(outcome: &TrainOutcome, elapsed_total_ms: u64) -> TrainingStatus {
        TrainingStatus::Done {
            epochs_run: outcome.epochs_run,
            early_stopped: outcome.early_stopped,
            was_stopped: outcome.cancelled,
            elapsed_total_ms,
        }
    }

    pub fn view(&self) -> TrainingView {
        match self {
            TrainingStatus::Idle => TrainingView::Idle,
            TrainingStatus::Running { total_epochs, .. } => TrainingView::Running { total_epochs: *total_epochs },
            TrainingStatus::Done { epochs_run, early_stopped, was_stopped, elapsed_total_ms } => TrainingView::Done {
                epochs_run: *epochs_run,
                early_stopped: *early_stopped,
                was_stopped: *was_stopped,
                elapsed_total_ms: *elapsed_total_ms,
            },
            TrainingStatus::Failed { reason } => TrainingView::Failed { reason: reason.clone() },
        }
    }
}

/// Serializable mirror of `TrainingStatus` without the channel handles.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrainingView {
    Idle,
    Running { total_epochs: usize },
    Done { epochs_run: usize, early_stopped: bool, was_stopped: bool, elapsed_total_ms: u64 },
    Failed { reason: String },
}

// ---------------------------------------------------------------------------
// ArenaState
// ---------------------------------------------------------------------------

pub struct ArenaState {
    pub session: GestureSession,
    /// Hand count reported by the client with each `/frame`.
    pub hands: Arc<AtomicUsize>,
    pub training: TrainingStatus,
    /// Epoch events of the current or last run, replayed to late SSE clients.
    pub epoch_history: Vec<EpochStats>,
}

impl ArenaState {
    pub fn new(session: GestureSession, hands: Arc<AtomicUsize>) -> ArenaState {
        ArenaState { session, hands, training: TrainingStatus::Idle, epoch_history: Vec::new() }
    }

    pub fn status(&self) -> ArenaStatus {
        ArenaStatus {
            session: self.session.snapshot(),
            training_run: self.training.view(),
            epochs_seen: self.epoch_history.len(),
        }
    }

    /// Records the epoch events of `event`; batch events are not kept.
    ///
    /// The SSE stream and the finishing job thread both drain the channel,
    /// so arrivals may interleave; history stays ordered by epoch.
    pub fn remember(&mut self, event: &TrainEvent) {
        if let TrainEvent::Epoch(stats) = event {
            let at = self.epoch_history.partition_point(|s| s.epoch < stats.epoch);
            self.epoch_history.insert(at, stats.clone());
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArenaStatus {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    pub training_run: TrainingView,
    pub epochs_seen: usize,
}

/// Shared state type, an `Arc<Mutex<ArenaState>>` passed to every handler.
pub type SharedState = Arc<Mutex<ArenaState>>;

/// Locks the arena state. A handler that panicked mid-request leaves the
/// session usable, so poisoning is ignored.
pub fn lock(state: &SharedState) -> MutexGuard<'_, ArenaState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
