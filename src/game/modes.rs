use std::time::Instant;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use crate::config::GameConfig;
use crate::game::arbiter::{resolve, Outcome};
use crate::game::gesture::{Gesture, BASE_CLASSES};
use crate::game::leaderboard::Leaderboard;
use crate::game::score::ScoreState;
use crate::game::speed::{SpeedChallenge, SpeedProgress};
use crate::persist::kv::KeyValueStore;

/// What one dispatched gesture produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Round {
    /// Player against a random AI move; counts towards the score.
    Solo { player: Gesture, ai: Gesture, outcome: Outcome, scores: ScoreState },
    /// Two players in the same frame; `outcome` is player one's. Not scored.
    Duel { p1: Gesture, p2: Gesture, outcome: Outcome },
    Speed(SpeedProgress),
}

/// Game-mode state and the handlers the inference loop dispatches to.
pub struct GameTable {
    pub scores: ScoreState,
    pub leaderboard: Leaderboard,
    pub multiplayer: bool,
    speed: Option<SpeedChallenge>,
    player_name: String,
    leaderboard_key: String,
    store: Box<dyn KeyValueStore>,
    rng: StdRng,
}

impl GameTable {
    pub fn new(config: &GameConfig, store: Box<dyn KeyValueStore>, rng: StdRng) -> GameTable {
        let leaderboard = Leaderboard::load(store.as_ref(), &config.leaderboard_key, config.leaderboard_size);
        GameTable {
            scores: ScoreState::default(),
            leaderboard,
            multiplayer: false,
            speed: None,
            player_name: config.player_name.clone(),
            leaderboard_key: config.leaderboard_key.clone(),
            store,
            rng,
        }
    }

    pub fn with_entropy(config: &GameConfig, store: Box<dyn KeyValueStore>) -> GameTable {
        GameTable::new(config, store, StdRng::from_entropy())
    }

    pub fn speed_active(&self) -> bool {
        self.speed.is_some()
    }

    pub fn speed_remaining(&self) -> Option<Vec<Gesture>> {
        self.speed.as_ref().map(SpeedChallenge::remaining)
    }

    pub fn start_speed_challenge(&mut self, now: Instant) {
        self.speed = Some(SpeedChallenge::start(now));
    }

    pub fn cancel_speed_challenge(&mut self) {
        self.speed = None;
    }

    /// Routes a smoothed gesture to exactly one mode: speed challenge, then
    /// multiplayer, then single player. `raw` is the unsmoothed
    /// classification of the same frame, used as the second player.
    pub fn dispatch(&mut self, smoothed: Gesture, raw: Gesture, now: Instant) -> Round {
        if let Some(challenge) = self.speed.as_mut() {
            let progress = challenge.observe(smoothed, now);
            if let SpeedProgress::Completed { elapsed_secs } = progress {
                log::info!("speed challenge completed in {:.2}s", elapsed_secs);
                self.speed = None;
            }
            Round::Speed(progress)
        } else if self.multiplayer {
            Round::Duel { p1: smoothed, p2: raw, outcome: resolve(smoothed, raw) }
        } else {
            self.play_solo(smoothed)
        }
    }

    fn play_solo(&mut self, player: Gesture) -> Round {
        let ai = Gesture::ALL[self.rng.gen_range(0..BASE_CLASSES)];
        let outcome = resolve(player, ai);
        self.record(outcome);
        Round::Solo { player, ai, outcome, scores: self.scores }
    }

    /// Updates the score and refreshes the persisted leaderboard. A storage
    /// failure is logged; the in-memory board is still updated.
    pub fn record(&mut self, outcome: Outcome) {
        self.scores.record(outcome);
        self.leaderboard.update(&self.player_name, self.scores.wins);
        if let Err(e) = self.leaderboard.save(self.store.as_mut(), &self.leaderboard_key) {
            log::warn!("could not persist leaderboard: {}", e);
        }
    }
}
