use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::persist::kv::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub wins: u32,
}

/// Top players by wins, one entry per name, persisted as a JSON array.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
    capacity: usize,
}

impl Leaderboard {
    pub fn new(capacity: usize) -> Leaderboard {
        Leaderboard { entries: Vec::new(), capacity }
    }

    /// Reads the board stored under `key`. A missing or unreadable value
    /// starts an empty board.
    pub fn load(store: &dyn KeyValueStore, key: &str, capacity: usize) -> Leaderboard {
        let entries = match store.get(key) {
            Ok(Some(json)) => serde_json::from_str::<Vec<LeaderboardEntry>>(&json).unwrap_or_else(|e| {
                log::warn!("discarding unreadable leaderboard: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("leaderboard store unavailable: {}", e);
                Vec::new()
            }
        };
        let mut board = Leaderboard { entries, capacity };
        board.normalise();
        board
    }

    pub fn save(&self, store: &mut dyn KeyValueStore, key: &str) -> Result<()> {
        store.set(key, &serde_json::to_string(&self.entries)?)
    }

    /// Replaces `name`'s entry with `wins`, then keeps the top `capacity`.
    pub fn update(&mut self, name: &str, wins: u32) {
        self.entries.retain(|e| e.name != name);
        self.entries.push(LeaderboardEntry { name: name.to_owned(), wins });
        self.normalise();
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    fn normalise(&mut self) {
        // Stable sort: equal wins keep their previous order.
        self.entries.sort_by(|a, b| b.wins.cmp(&a.wins));
        self.entries.truncate(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::kv::MemoryStore;

    #[test]
    fn update_replaces_existing_player() {
        let mut board = Leaderboard::new(5);
        board.update("Player", 3);
        board.update("Player", 5);
        assert_eq!(board.entries(), &[LeaderboardEntry { name: "Player".into(), wins: 5 }]);
    }

    #[test]
    fn keeps_top_five() {
        let mut board = Leaderboard::new(5);
        for (i, name) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            board.update(name, (i as u32 + 1) * 2);
        }
        board.update("f", 5);
        let names: Vec<&str> = board.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["e", "d", "c", "f", "b"]);
    }

    #[test]
    fn survives_a_store_round_trip_and_garbage() {
        let mut store = MemoryStore::new();
        let mut board = Leaderboard::new(5);
        board.update("Ada", 4);
        board.save(&mut store, "board").unwrap();
        assert_eq!(Leaderboard::load(&store, "board", 5), board);

        store.set("board", "not json").unwrap();
        assert!(Leaderboard::load(&store, "board", 5).entries().is_empty());
    }
}
