use std::fmt;

use serde::Serialize;

use crate::game::gesture::Gesture;
use crate::game::leaderboard::LeaderboardEntry;
use crate::game::score::ScoreState;
use crate::inference::loop_fn::LoopState;
use crate::train::epoch_stats::TrainingStats;

/// User-visible lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Initializing,
    Ready,
    Training,
    Predicting,
    Loading,
    Error,
}

impl Status {
    pub fn text(self) -> &'static str {
        match self {
            Status::Initializing => "Initializing...",
            Status::Ready => "Ready",
            Status::Training => "Training Model...",
            Status::Predicting => "Predicting",
            Status::Loading => "Loading Model...",
            Status::Error => "Error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GestureCount {
    pub gesture: Gesture,
    pub count: usize,
}

/// Per-gesture sample counts after an `add_sample`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleReport {
    pub counts: Vec<GestureCount>,
    pub total: usize,
    /// Enough samples collected for a useful first training run.
    pub ready_to_train: bool,
}

/// Total above which `SampleReport::ready_to_train` is set.
pub const READY_THRESHOLD: usize = 15;

impl SampleReport {
    pub fn from_labels(labels: &[usize]) -> SampleReport {
        let counts = Gesture::ALL
            .iter()
            .map(|&gesture| GestureCount {
                gesture,
                count: labels.iter().filter(|&&l| l == gesture.index()).count(),
            })
            .collect();
        SampleReport { counts, total: labels.len(), ready_to_train: labels.len() > READY_THRESHOLD }
    }

    pub fn count(&self, gesture: Gesture) -> usize {
        self.counts.iter().find(|c| c.gesture == gesture).map_or(0, |c| c.count)
    }
}

/// Everything a front-end needs to render the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: Status,
    pub status_text: &'static str,
    pub last_error: Option<String>,
    pub has_model: bool,
    pub num_classes: usize,
    pub training: bool,
    pub predicting: bool,
    pub loop_state: LoopState,
    pub boost: bool,
    pub multiplayer: bool,
    pub speed_remaining: Option<Vec<Gesture>>,
    pub samples: SampleReport,
    pub stats: Option<TrainingStats>,
    pub current: Option<Gesture>,
    pub history: Vec<Gesture>,
    pub scores: ScoreState,
    pub leaderboard: Vec<LeaderboardEntry>,
}
