//! Command-line driver for the gesture classifier.
//!
//! ```text
//! ferrite-gesture train <dataset_dir> [config.json]
//! ferrite-gesture play  <frames_dir>  [config.json]
//! ```
//!
//! `train` expects one sub-directory of images per gesture (`rock/`,
//! `paper/`, ...), trains a head, and saves the model and the dataset.
//! `play` replays a directory of frames against the saved model as if every
//! frame showed one hand. The interactive front-end is the `arena` binary.

use std::path::Path;
use std::time::{Duration, Instant};

use ferrite_gesture::error::Result;
use ferrite_gesture::game::Round;
use ferrite_gesture::inference::TickOutcome;
use ferrite_gesture::vision::{open_with_fallbacks, Camera, ImageDirCamera};
use ferrite_gesture::{GestureConfig, GestureSession, Gesture, PooledPixelExtractor, ReportedHands};

/// Simulated time between replayed frames (30 fps).
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let (command, dir) = match (args.get(1), args.get(2)) {
        (Some(command), Some(dir)) => (command.as_str(), Path::new(dir)),
        _ => {
            eprintln!("usage: ferrite-gesture <train|play> <dir> [config.json]");
            std::process::exit(2);
        }
    };

    let result = load_config(args.get(3).map(String::as_str)).and_then(|config| match command {
        "train" => train(config, dir),
        "play" => play(config, dir),
        other => {
            eprintln!("unknown command {:?}", other);
            std::process::exit(2);
        }
    });
    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&str>) -> Result<GestureConfig> {
    match path {
        Some(path) => GestureConfig::load_json(path),
        None => Ok(GestureConfig::default()),
    }
}

fn open_session(config: GestureConfig, hands: &ReportedHands) -> Result<GestureSession> {
    let extractor = PooledPixelExtractor::new(config.vision.input_size, config.vision.grid);
    let mut session = GestureSession::open(config, Box::new(extractor), Box::new(hands.clone()))?;
    session.initialize();
    Ok(session)
}

fn train(config: GestureConfig, dataset_dir: &Path) -> Result<()> {
    let epochs = config.training.epochs;
    let mut session = open_session(config, &ReportedHands::new(1))?;

    for entry in std::fs::read_dir(dataset_dir)? {
        let path = entry?.path();
        let gesture = match path.file_name().and_then(|n| n.to_str()).map(str::parse::<Gesture>) {
            Some(Ok(gesture)) if path.is_dir() => gesture,
            _ => {
                log::warn!("skipping {:?}", path);
                continue;
            }
        };
        let mut camera = ImageDirCamera::new(&path);
        open_with_fallbacks(&mut camera)?;
        for _ in 0..camera.frame_count() {
            let report = session.add_sample(&camera.capture()?, gesture)?;
            log::debug!("{} samples of {}", report.count(gesture), gesture);
        }
    }

    let samples = session.snapshot().samples;
    for count in samples.counts.iter().filter(|c| c.count > 0) {
        log::info!("{:<12}{:>6} samples", count.gesture.name(), count.count);
    }
    if !samples.ready_to_train {
        log::warn!("only {} samples; accuracy will be poor", samples.total);
    }

    let outcome = session.train(epochs)?;
    if let Some(stats) = outcome.stats {
        println!("accuracy {:.2}%  loss {:.5}  epochs {}", stats.accuracy * 100.0, stats.loss, outcome.epochs_run);
    }
    let files = session.save_model()?;
    let dataset = session.save_dataset()?;
    println!("model saved to {:?} and {:?}", files.json, files.weights);
    println!("dataset saved to {:?}", dataset);
    Ok(())
}

fn play(config: GestureConfig, frames_dir: &Path) -> Result<()> {
    let hands = ReportedHands::new(1);
    hands.counter().store(1, std::sync::atomic::Ordering::Relaxed);
    let mut session = open_session(config, &hands)?;
    if session.head().is_none() {
        session.load_model(None)?;
    }

    let mut camera = ImageDirCamera::new(frames_dir);
    open_with_fallbacks(&mut camera)?;
    session.start_predicting()?;

    let start = Instant::now();
    let mut tick = 0u32;
    for _ in 0..camera.frame_count() {
        let frame = camera.capture()?;
        // Two ticks per frame so every frame lands on a classification tick.
        for _ in 0..2 {
            let now = start + FRAME_INTERVAL * tick;
            tick += 1;
            if let TickOutcome::Classified { prediction, round: Some(round), .. } = session.tick(&frame, now)? {
                report_round(&round, prediction.confidence);
            }
        }
    }
    session.stop_predicting();

    let snapshot = session.snapshot();
    let history: Vec<&str> = snapshot.history.iter().map(|g| g.name()).collect();
    println!("history: {}", history.join(", "));
    for (rank, entry) in snapshot.leaderboard.iter().enumerate() {
        println!("{:>2}. {:<16}{:>4}", rank + 1, entry.name, entry.wins);
    }
    Ok(())
}

fn report_round(round: &Round, confidence: f64) {
    match round {
        Round::Solo { player, ai, outcome, scores } => println!(
            "you {:<9} ai {:<9} {:?}  ({:.1}%)  W{} L{} T{}",
            player.name(), ai.name(), outcome, confidence, scores.wins, scores.losses, scores.ties
        ),
        other => println!("{:?}", other),
    }
}
