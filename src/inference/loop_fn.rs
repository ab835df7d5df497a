use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::InferenceConfig;
use crate::error::{GestureError, Result};
use crate::game::gesture::Gesture;
use crate::game::modes::{GameTable, Round};
use crate::inference::predictor::{classify, Prediction};
use crate::inference::smoother::PredictionSmoother;
use crate::inference::throttle::Throttle;
use crate::network::network::ClassifierHead;
use crate::vision::extractor::FeatureExtractor;
use crate::vision::hands::{HandDetector, HandResults};
use crate::vision::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    Detecting,
    Throttled,
    Classifying,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tick", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Prediction is off; nothing ran.
    Stopped,
    /// Off-beat tick: only the hand detector ran.
    Skipped { hands: HandResults },
    Throttled { hands: HandResults },
    NoHand,
    Classified {
        prediction: Prediction,
        /// Stable gesture after smoothing, if one has been decided.
        smoothed: Option<Gesture>,
        /// Game round the stable gesture was dispatched to.
        round: Option<Round>,
        hands: HandResults,
    },
}

/// Per-frame orchestration while predicting.
///
/// Every tick forwards the frame to the hand detector. Every `frame_skip`-th
/// tick classifies, unless the throttle is closed or no hand is visible.
/// Classification feeds the smoother, and a decided gesture is dispatched to
/// the game table. Any error stops the loop.
#[derive(Debug)]
pub struct InferenceLoop {
    frame_skip: u64,
    history_len: usize,
    frame_count: u64,
    throttle: Throttle,
    smoother: PredictionSmoother,
    state: LoopState,
    predicting: bool,
    history: VecDeque<Gesture>,
}

impl InferenceLoop {
    pub fn new(config: &InferenceConfig) -> InferenceLoop {
        InferenceLoop {
            frame_skip: config.frame_skip.max(1),
            history_len: config.history_len,
            frame_count: 0,
            throttle: Throttle::new(Duration::from_millis(config.throttle_ms)),
            smoother: PredictionSmoother::new(),
            state: LoopState::Idle,
            predicting: false,
            history: VecDeque::new(),
        }
    }

    /// Clears the smoother, history, frame counter and throttle and starts
    /// predicting.
    pub fn start(&mut self) {
        self.smoother.reset();
        self.history.clear();
        self.frame_count = 0;
        self.throttle.release();
        self.predicting = true;
        self.state = LoopState::Detecting;
    }

    /// Takes effect at the next tick.
    pub fn stop(&mut self) {
        self.predicting = false;
        self.state = LoopState::Idle;
    }

    pub fn is_predicting(&self) -> bool {
        self.predicting
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Latest stable gesture.
    pub fn current(&self) -> Option<Gesture> {
        self.smoother.current().and_then(Gesture::from_index)
    }

    /// Recent distinct stable gestures, newest first.
    pub fn history(&self) -> Vec<Gesture> {
        self.history.iter().copied().collect()
    }

    pub fn tick(
        &mut self,
        frame: &Frame,
        now: Instant,
        head: &ClassifierHead,
        extractor: &dyn FeatureExtractor,
        detector: &mut dyn HandDetector,
        table: &mut GameTable,
    ) -> Result<TickOutcome> {
        if !self.predicting {
            self.state = LoopState::Idle;
            return Ok(TickOutcome::Stopped);
        }
        match self.run_tick(frame, now, head, extractor, detector, table) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                log::error!("inference stopped: {}", e);
                self.stop();
                Err(e)
            }
        }
    }

    fn run_tick(
        &mut self,
        frame: &Frame,
        now: Instant,
        head: &ClassifierHead,
        extractor: &dyn FeatureExtractor,
        detector: &mut dyn HandDetector,
        table: &mut GameTable,
    ) -> Result<TickOutcome> {
        self.frame_count += 1;
        self.state = LoopState::Detecting;
        let hands = detector.send(frame)?;

        if self.frame_count % self.frame_skip != 0 {
            return Ok(TickOutcome::Skipped { hands });
        }
        if self.throttle.is_throttled(now) {
            self.state = LoopState::Throttled;
            return Ok(TickOutcome::Throttled { hands });
        }
        self.throttle.arm(now);

        if !hands.hand_present() {
            self.state = LoopState::Idle;
            return Ok(TickOutcome::NoHand);
        }

        self.state = LoopState::Classifying;
        log::trace!("hand boxes {:?}", hands.boxes(frame.width(), frame.height()));
        let prediction = classify(head, extractor, frame)?;
        let raw = Gesture::from_index(prediction.class_id).ok_or_else(|| {
            GestureError::PredictionFailed(format!("class id {} has no gesture", prediction.class_id))
        })?;
        let smoothed = self.smoother.push(prediction.class_id).and_then(Gesture::from_index);
        log::debug!("raw {} ({:.1}%), stable {:?}", raw, prediction.confidence, smoothed);

        let round = smoothed.map(|gesture| {
            self.remember(gesture);
            table.dispatch(gesture, raw, now)
        });
        Ok(TickOutcome::Classified { prediction, smoothed, round, hands })
    }

    fn remember(&mut self, gesture: Gesture) {
        if self.history.front() != Some(&gesture) {
            self.history.push_front(gesture);
            self.history.truncate(self.history_len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    use crate::config::{GameConfig, TrainingConfig};
    use crate::network::spec::HeadSpec;
    use crate::persist::kv::MemoryStore;
    use crate::vision::extractor::EmbeddingShape;
    use crate::vision::hands::HandLandmarks;

    struct ConstantExtractor(Vec<f64>);

    impl FeatureExtractor for ConstantExtractor {
        fn output_shape(&self) -> EmbeddingShape {
            EmbeddingShape::new(1, 1, self.0.len())
        }

        fn embed(&self, _frame: &Frame) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }
    }

    struct ScriptedDetector {
        hand: bool,
        fail: bool,
        calls: usize,
    }

    impl HandDetector for ScriptedDetector {
        fn set_max_hands(&mut self, _max_hands: usize) {}

        fn send(&mut self, _frame: &Frame) -> Result<HandResults> {
            self.calls += 1;
            if self.fail {
                return Err(GestureError::HandDetector("lost".into()));
            }
            let hands = if self.hand { vec![HandLandmarks::default()] } else { Vec::new() };
            Ok(HandResults { hands })
        }
    }

    struct Rig {
        looper: InferenceLoop,
        head: ClassifierHead,
        extractor: ConstantExtractor,
        detector: ScriptedDetector,
        table: GameTable,
        frame: Frame,
    }

    impl Rig {
        fn new() -> Rig {
            let mut rng = StdRng::seed_from_u64(4);
            let head = ClassifierHead::new(HeadSpec::for_classes(3, 5, &TrainingConfig::default()), &mut rng);
            let mut looper = InferenceLoop::new(&InferenceConfig::default());
            looper.start();
            Rig {
                looper,
                head,
                extractor: ConstantExtractor(vec![0.2, 0.4, 0.6]),
                detector: ScriptedDetector { hand: true, fail: false, calls: 0 },
                table: GameTable::new(&GameConfig::default(), Box::new(MemoryStore::new()), StdRng::seed_from_u64(8)),
                frame: Frame::new(4, 4),
            }
        }

        fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
            self.looper.tick(&self.frame, now, &self.head, &self.extractor, &mut self.detector, &mut self.table)
        }
    }

    #[test]
    fn detector_runs_every_tick_and_classification_alternates() {
        let mut rig = Rig::new();
        let t0 = Instant::now();
        assert!(matches!(rig.tick(t0).unwrap(), TickOutcome::Skipped { .. }));
        assert!(matches!(rig.tick(t0).unwrap(), TickOutcome::Classified { .. }));
        assert!(matches!(rig.tick(t0).unwrap(), TickOutcome::Skipped { .. }));
        // Still inside the 50 ms window.
        assert!(matches!(rig.tick(t0 + Duration::from_millis(10)).unwrap(), TickOutcome::Throttled { .. }));
        assert_eq!(rig.looper.state(), LoopState::Throttled);
        assert!(matches!(rig.tick(t0).unwrap(), TickOutcome::Skipped { .. }));
        assert!(matches!(rig.tick(t0 + Duration::from_millis(60)).unwrap(), TickOutcome::Classified { .. }));
        assert_eq!(rig.detector.calls, 6);
    }

    #[test]
    fn constant_frames_become_a_scored_round() {
        let mut rig = Rig::new();
        let t0 = Instant::now();
        let mut rounds = Vec::new();
        for i in 0..8 {
            if let TickOutcome::Classified { round, smoothed, prediction, .. } =
                rig.tick(t0 + Duration::from_millis(100 * i)).unwrap()
            {
                assert!(prediction.confidence > 0.0 && prediction.confidence <= 100.0);
                if let Some(round) = round {
                    assert_eq!(smoothed.map(Gesture::index), Some(prediction.class_id));
                    rounds.push(round);
                }
            }
        }
        // Four classifications; the smoother decides on the second.
        assert_eq!(rounds.len(), 3);
        assert!(rounds.iter().all(|r| matches!(r, Round::Solo { .. })));
        assert_eq!(rig.table.scores.rounds(), 3);
        assert_eq!(rig.looper.history().len(), 1);
    }

    #[test]
    fn no_hand_skips_classification() {
        let mut rig = Rig::new();
        rig.detector.hand = false;
        let t0 = Instant::now();
        rig.tick(t0).unwrap();
        assert_eq!(rig.tick(t0).unwrap(), TickOutcome::NoHand);
        assert_eq!(rig.looper.current(), None);
        assert_eq!(rig.table.scores.rounds(), 0);
    }

    #[test]
    fn an_error_stops_the_loop() {
        let mut rig = Rig::new();
        rig.detector.fail = true;
        assert!(rig.tick(Instant::now()).is_err());
        assert!(!rig.looper.is_predicting());
        assert_eq!(rig.looper.state(), LoopState::Idle);

        rig.detector.fail = false;
        assert_eq!(rig.tick(Instant::now()).unwrap(), TickOutcome::Stopped);
    }

    #[test]
    fn history_keeps_distinct_consecutive_gestures() {
        let mut looper = InferenceLoop::new(&InferenceConfig { history_len: 3, ..InferenceConfig::default() });
        for g in [Gesture::Rock, Gesture::Rock, Gesture::Paper, Gesture::Rock, Gesture::Spock, Gesture::Lizard] {
            looper.remember(g);
        }
        assert_eq!(looper.history(), vec![Gesture::Lizard, Gesture::Spock, Gesture::Rock]);
    }
}
