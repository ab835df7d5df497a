use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

/// Hand signs the classifier can predict. Discriminants are the class ids
/// used for labels and network outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gesture {
    Rock = 0,
    Paper = 1,
    Scissors = 2,
    Spock = 3,
    Lizard = 4,
    Custom = 5,
}

/// Number of classes when no custom gesture is in play.
pub const BASE_CLASSES: usize = 5;
/// Number of classes once the custom gesture (or multiplayer) is enabled.
pub const EXTENDED_CLASSES: usize = 6;

impl Gesture {
    pub const ALL: [Gesture; EXTENDED_CLASSES] = [
        Gesture::Rock,
        Gesture::Paper,
        Gesture::Scissors,
        Gesture::Spock,
        Gesture::Lizard,
        Gesture::Custom,
    ];

    pub fn from_index(index: usize) -> Option<Gesture> {
        Gesture::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Gesture::Rock => "Rock",
            Gesture::Paper => "Paper",
            Gesture::Scissors => "Scissors",
            Gesture::Spock => "Spock",
            Gesture::Lizard => "Lizard",
            Gesture::Custom => "Custom",
        }
    }

    /// Labels for a classifier with `num_classes` outputs.
    pub fn labels(num_classes: usize) -> Vec<String> {
        Gesture::ALL.iter().take(num_classes).map(|g| g.name().to_owned()).collect()
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error of `Gesture::from_str`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGesture(pub String);

impl fmt::Display for UnknownGesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown gesture {:?}", self.0)
    }
}

impl std::error::Error for UnknownGesture {}

/// Accepts a gesture name in any case or a class id.
impl FromStr for Gesture {
    type Err = UnknownGesture;

    fn from_str(s: &str) -> Result<Gesture, UnknownGesture> {
        let s = s.trim();
        if let Ok(index) = s.parse::<usize>() {
            return Gesture::from_index(index).ok_or_else(|| UnknownGesture(s.to_owned()));
        }
        Gesture::ALL
            .iter()
            .copied()
            .find(|g| g.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownGesture(s.to_owned()))
    }
}
