pub mod arbiter;
pub mod gesture;
pub mod leaderboard;
pub mod modes;
pub mod score;
pub mod speed;

pub use arbiter::{resolve, Outcome};
pub use gesture::{Gesture, UnknownGesture, BASE_CLASSES, EXTENDED_CLASSES};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use modes::{GameTable, Round};
pub use score::ScoreState;
pub use speed::{SpeedChallenge, SpeedProgress, SPEED_SEQUENCE};
