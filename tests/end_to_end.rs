use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use ferrite_gesture::config::{GestureConfig, TrainingConfig};
use ferrite_gesture::game::{resolve, Gesture, Outcome, Round};
use ferrite_gesture::inference::predictor::predict_embedding;
use ferrite_gesture::inference::{PredictionSmoother, TickOutcome};
use ferrite_gesture::train::EarlyStopping;
use ferrite_gesture::vision::{EmbeddingShape, FeatureExtractor, Frame, ReportedHands};
use ferrite_gesture::{GestureError, GestureSession, MemoryStore, ModelSource, Result, Status};

/// Mean of each colour channel.
struct Tint;

impl FeatureExtractor for Tint {
    fn output_shape(&self) -> EmbeddingShape {
        EmbeddingShape::new(1, 1, 3)
    }

    fn embed(&self, frame: &Frame) -> Result<Vec<f64>> {
        let n = (frame.width() * frame.height()) as f64;
        let mut sums = [0.0; 3];
        for pixel in frame.pixels() {
            for c in 0..3 {
                sums[c] += pixel[c] as f64 / 255.0;
            }
        }
        Ok(sums.iter().map(|s| s / n).collect())
    }
}

fn config(seed: u64) -> GestureConfig {
    GestureConfig {
        training: TrainingConfig { seed: Some(seed), ..TrainingConfig::default() },
        ..GestureConfig::default()
    }
}

fn memory_session(config: GestureConfig, hands: &ReportedHands) -> GestureSession {
    GestureSession::new(
        config,
        Box::new(Tint),
        Box::new(hands.clone()),
        Box::new(MemoryStore::new()),
        Box::new(MemoryStore::new()),
    )
}

fn tint_of(gesture: Gesture) -> [f64; 3] {
    match gesture {
        Gesture::Rock => [0.9, 0.1, 0.1],
        Gesture::Paper => [0.1, 0.9, 0.1],
        Gesture::Scissors => [0.1, 0.1, 0.9],
        Gesture::Lizard => [0.9, 0.9, 0.1],
        Gesture::Spock => [0.1, 0.9, 0.9],
        Gesture::Custom => [0.9, 0.1, 0.9],
    }
}

/// Five jittered embeddings per base gesture.
fn collect_base(session: &mut GestureSession) {
    for &g in &Gesture::ALL[..5] {
        for i in 0..5 {
            let jitter = 0.02 * i as f64;
            let e: Vec<f64> = tint_of(g).iter().map(|v| v - jitter).collect();
            session.add_embedding(e, g).unwrap();
        }
    }
}

#[test]
fn few_shot_training_then_prediction() {
    let hands = ReportedHands::new(1);
    let mut session = memory_session(config(5), &hands);
    collect_base(&mut session);
    assert_eq!(session.examples().len(), 25);

    let outcome = session.train(10).unwrap();
    assert!(outcome.epochs_run >= 1 && outcome.epochs_run <= 10);
    assert!(!outcome.cancelled);
    let stats = outcome.stats.unwrap();
    assert!(stats.loss.is_finite());
    assert!((0.0..=1.0).contains(&stats.accuracy));
    assert_eq!(session.status(), Status::Ready);

    let head = session.head().unwrap();
    assert_eq!(head.num_classes(), 5);
    let p = predict_embedding(head, vec![0.85, 0.12, 0.08]).unwrap();
    assert!(p.class_id < 5);
    assert!(p.confidence >= 20.0 && p.confidence <= 100.0);
}

#[test]
fn boost_doubles_the_epoch_budget() {
    let hands = ReportedHands::new(1);
    let mut cfg = config(8);
    cfg.training.min_stop_accuracy = 2.0;
    let mut session = memory_session(cfg, &hands);
    collect_base(&mut session);
    assert!(session.toggle_boost());
    let outcome = session.train(3).unwrap();
    assert_eq!(outcome.epochs_run, 6);
    assert!(!outcome.early_stopped);
}

#[test]
fn early_stopping_needs_both_stall_and_accuracy() {
    let losses = [1.0, 0.9, 0.95, 0.95, 0.95, 0.95];

    let mut accurate = EarlyStopping::new(3, 0.85);
    let fired: Vec<bool> = losses.iter().map(|&l| accurate.observe(l, 0.9)).collect();
    assert_eq!(fired, vec![false, false, false, false, true, true]);
    assert_eq!(accurate.best_loss(), 0.9);

    let mut inaccurate = EarlyStopping::new(3, 0.85);
    assert!(losses.iter().all(|&l| !inaccurate.observe(l, 0.85)));
}

#[test]
fn smoother_debounces_flicker() {
    let mut smoother = PredictionSmoother::new();
    let emitted: Vec<Option<usize>> = [0, 0, 0, 1, 1].iter().map(|&id| smoother.push(id)).collect();
    assert_eq!(emitted, vec![None, Some(0), Some(0), Some(0), Some(0)]);
    assert_eq!(smoother.push(1), Some(1));

    let mut fresh = PredictionSmoother::new();
    assert_eq!(fresh.push(3), None);
    assert_eq!(fresh.push(3), Some(3));
}

#[test]
fn arbiter_is_antisymmetric_over_base_gestures() {
    for &a in &Gesture::ALL[..5] {
        let wins = Gesture::ALL[..5].iter().filter(|&&b| resolve(a, b) == Outcome::Win).count();
        assert_eq!(wins, 2, "{} should beat exactly two gestures", a);
        for &b in &Gesture::ALL[..5] {
            match resolve(a, b) {
                Outcome::Tie => assert_eq!(a, b),
                Outcome::Win => assert_eq!(resolve(b, a), Outcome::Loss),
                Outcome::Loss => assert_eq!(resolve(b, a), Outcome::Win),
            }
        }
    }
    assert_eq!(resolve(Gesture::Custom, Gesture::Custom), Outcome::Tie);
    assert_eq!(resolve(Gesture::Custom, Gesture::Rock), Outcome::Loss);
}

#[test]
fn predicting_session_scores_solo_rounds() {
    let hands = ReportedHands::new(1);
    let counter = hands.counter();
    let mut session = memory_session(config(13), &hands);
    collect_base(&mut session);
    session.train(5).unwrap();

    let frame = Frame::from_pixel(8, 8, image::Rgb([230, 25, 25]));
    assert!(matches!(session.tick(&frame, Instant::now()), Ok(TickOutcome::Stopped)));

    session.start_predicting().unwrap();
    assert_eq!(session.status(), Status::Predicting);

    counter.store(0, Ordering::SeqCst);
    let mut now = Instant::now();
    let mut saw_no_hand = false;
    for _ in 0..4 {
        now += Duration::from_millis(100);
        saw_no_hand |= matches!(session.tick(&frame, now).unwrap(), TickOutcome::NoHand);
    }
    assert!(saw_no_hand);

    counter.store(1, Ordering::SeqCst);
    let mut solo_rounds = 0;
    for _ in 0..20 {
        now += Duration::from_millis(100);
        if let TickOutcome::Classified { round: Some(Round::Solo { .. }), .. } = session.tick(&frame, now).unwrap() {
            solo_rounds += 1;
        }
    }
    assert!(solo_rounds >= 1);
    assert_eq!(session.table().scores.rounds(), solo_rounds);
    assert_eq!(session.snapshot().history.len(), 1);

    session.stop_predicting();
    assert_eq!(session.status(), Status::Ready);
}

#[test]
fn training_is_rejected_until_enough_samples() {
    let hands = ReportedHands::new(1);
    let mut session = memory_session(config(1), &hands);
    session.add_embedding(vec![0.5, 0.5, 0.5], Gesture::Rock).unwrap();
    let err = session.train(10).unwrap_err();
    assert!(matches!(err, GestureError::InsufficientSamples { required: 5, actual: 1 }));
    assert!(session.head().is_none());
    assert!(matches!(session.start_predicting(), Err(GestureError::ModelMissing)));
}

#[test]
fn saved_model_is_preloaded_by_the_next_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(21);
    cfg.storage.data_dir = dir.path().join("data");
    cfg.storage.download_dir = dir.path().join("downloads");

    let hands = ReportedHands::new(1);
    let mut first = GestureSession::open(cfg.clone(), Box::new(Tint), Box::new(hands.clone())).unwrap();
    collect_base(&mut first);
    first.train(3).unwrap();
    let files = first.save_model().unwrap();
    assert!(files.json.exists() && files.weights.exists());
    let probe = vec![0.2, 0.8, 0.2];
    let before = predict_embedding(first.head().unwrap(), probe.clone()).unwrap();

    let mut second = GestureSession::open(cfg, Box::new(Tint), Box::new(hands)).unwrap();
    assert_eq!(second.initialize(), Some(ModelSource::Local));
    assert_eq!(second.status(), Status::Ready);
    let after = predict_embedding(second.head().unwrap(), probe).unwrap();
    assert_eq!(before, after);

    // The local copy is tried before a manual pair.
    assert_eq!(second.load_model(Some(&files)).unwrap(), ModelSource::Local);
}
