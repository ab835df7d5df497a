use serde::{Serialize, Deserialize};

use crate::game::gesture::Gesture;

/// Result of a round from the first player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

/// Directed "beats" edges: (winner, loser).
///
/// `Custom` never appears, so it only ties with itself and loses otherwise
/// when played by the first player.
const WIN_EDGES: [(Gesture, Gesture); 10] = [
    (Gesture::Rock, Gesture::Scissors),
    (Gesture::Rock, Gesture::Lizard),
    (Gesture::Paper, Gesture::Rock),
    (Gesture::Paper, Gesture::Spock),
    (Gesture::Scissors, Gesture::Paper),
    (Gesture::Scissors, Gesture::Lizard),
    (Gesture::Spock, Gesture::Scissors),
    (Gesture::Spock, Gesture::Rock),
    (Gesture::Lizard, Gesture::Spock),
    (Gesture::Lizard, Gesture::Paper),
];

/// Resolves `player` against `opponent`.
pub fn resolve(player: Gesture, opponent: Gesture) -> Outcome {
    if player == opponent {
        Outcome::Tie
    } else if WIN_EDGES.contains(&(player, opponent)) {
        Outcome::Win
    } else {
        Outcome::Loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Gesture::*;

    #[test]
    fn named_rounds() {
        assert_eq!(resolve(Rock, Scissors), Outcome::Win);
        assert_eq!(resolve(Scissors, Rock), Outcome::Loss);
        assert_eq!(resolve(Spock, Spock), Outcome::Tie);
        assert_eq!(resolve(Lizard, Paper), Outcome::Win);
    }

    #[test]
    fn every_distinct_pair_has_exactly_one_winner() {
        let base = [Rock, Paper, Scissors, Spock, Lizard];
        for a in base {
            let wins = base.iter().filter(|&&b| resolve(a, b) == Outcome::Win).count();
            assert_eq!(wins, 2, "{} should beat exactly two gestures", a);
            for b in base {
                if a != b {
                    assert_ne!(resolve(a, b), resolve(b, a));
                }
            }
        }
    }

    #[test]
    fn custom_never_wins() {
        assert_eq!(resolve(Custom, Custom), Outcome::Tie);
        for g in [Rock, Paper, Scissors, Spock, Lizard] {
            assert_eq!(resolve(Custom, g), Outcome::Loss);
            assert_eq!(resolve(g, Custom), Outcome::Loss);
        }
    }
}
