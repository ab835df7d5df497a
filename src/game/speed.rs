use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Serialize, Deserialize};

use crate::game::gesture::Gesture;

/// Order the player has to show the gestures in.
pub const SPEED_SEQUENCE: [Gesture; 5] = [
    Gesture::Rock,
    Gesture::Paper,
    Gesture::Scissors,
    Gesture::Spock,
    Gesture::Lizard,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SpeedProgress {
    /// The gesture did not match; still waiting for `next`.
    Waiting { next: Vec<Gesture> },
    /// The head of the sequence matched.
    Advanced { matched: Gesture, remaining: Vec<Gesture> },
    Completed { elapsed_secs: f64 },
}

/// Timed run through `SPEED_SEQUENCE`.
#[derive(Debug, Clone)]
pub struct SpeedChallenge {
    remaining: VecDeque<Gesture>,
    started_at: Instant,
}

impl SpeedChallenge {
    pub fn start(now: Instant) -> SpeedChallenge {
        SpeedChallenge { remaining: SPEED_SEQUENCE.iter().copied().collect(), started_at: now }
    }

    pub fn remaining(&self) -> Vec<Gesture> {
        self.remaining.iter().copied().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }

    pub fn observe(&mut self, gesture: Gesture, now: Instant) -> SpeedProgress {
        if self.remaining.front() != Some(&gesture) {
            return SpeedProgress::Waiting { next: self.remaining() };
        }
        self.remaining.pop_front();
        if self.remaining.is_empty() {
            let elapsed: Duration = now.saturating_duration_since(self.started_at);
            SpeedProgress::Completed { elapsed_secs: elapsed.as_secs_f64() }
        } else {
            SpeedProgress::Advanced { matched: gesture, remaining: self.remaining() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_in_order_only() {
        let t0 = Instant::now();
        let mut challenge = SpeedChallenge::start(t0);
        assert!(matches!(challenge.observe(Gesture::Paper, t0), SpeedProgress::Waiting { .. }));
        assert_eq!(
            challenge.observe(Gesture::Rock, t0),
            SpeedProgress::Advanced {
                matched: Gesture::Rock,
                remaining: vec![Gesture::Paper, Gesture::Scissors, Gesture::Spock, Gesture::Lizard],
            }
        );
        for g in [Gesture::Paper, Gesture::Scissors, Gesture::Spock] {
            challenge.observe(g, t0);
        }
        let done = challenge.observe(Gesture::Lizard, t0 + Duration::from_millis(2500));
        assert_eq!(done, SpeedProgress::Completed { elapsed_secs: 2.5 });
        assert!(challenge.is_complete());
    }
}
