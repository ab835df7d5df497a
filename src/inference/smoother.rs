use std::collections::VecDeque;

/// Raw ids kept in the window.
pub const WINDOW: usize = 5;

/// Debounces per-frame class ids into a stable prediction.
///
/// The most common id in the last `WINDOW` raw ids becomes the stable
/// prediction once it occurs at least 3 times, or at least twice while the
/// window is still filling. Otherwise the previous stable id is kept.
#[derive(Debug, Clone, Default)]
pub struct PredictionSmoother {
    buffer: VecDeque<usize>,
    last: Option<usize>,
}

impl PredictionSmoother {
    pub fn new() -> PredictionSmoother {
        PredictionSmoother::default()
    }

    /// Feeds one raw id; returns the stable id (`None` until one is decided).
    pub fn push(&mut self, raw: usize) -> Option<usize> {
        self.buffer.push_back(raw);
        if self.buffer.len() > WINDOW {
            self.buffer.pop_front();
        }

        if let Some((id, count)) = self.most_common() {
            if count >= 3 || (self.buffer.len() < WINDOW && count >= 2) {
                self.last = Some(id);
            }
        }
        self.last
    }

    /// Stable id emitted by the latest `push`.
    pub fn current(&self) -> Option<usize> {
        self.last
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last = None;
    }

    /// Highest-count id; on equal counts the id seen first (oldest) wins.
    fn most_common(&self) -> Option<(usize, usize)> {
        let mut counts: Vec<(usize, usize)> = Vec::with_capacity(WINDOW);
        for &id in &self.buffer {
            match counts.iter_mut().find(|(seen, _)| *seen == id) {
                Some((_, n)) => *n += 1,
                None => counts.push((id, 1)),
            }
        }
        let mut best: Option<(usize, usize)> = None;
        for (id, n) in counts {
            if best.map_or(true, |(_, b)| n > b) {
                best = Some((id, n));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(smoother: &mut PredictionSmoother, ids: &[usize]) -> Vec<Option<usize>> {
        ids.iter().map(|&id| smoother.push(id)).collect()
    }

    #[test]
    fn majority_of_three_holds_against_two() {
        let mut s = PredictionSmoother::new();
        let out = feed(&mut s, &[0, 0, 0, 1, 1]);
        assert_eq!(out, vec![None, Some(0), Some(0), Some(0), Some(0)]);
        // 1 takes over only once it has three of the five slots.
        assert_eq!(feed(&mut s, &[1]), vec![Some(1)]);
    }

    #[test]
    fn two_matching_ids_decide_while_filling() {
        let mut s = PredictionSmoother::new();
        assert_eq!(feed(&mut s, &[3, 3]), vec![None, Some(3)]);
    }

    #[test]
    fn full_window_without_majority_keeps_previous() {
        let mut s = PredictionSmoother::new();
        feed(&mut s, &[2, 2]);
        let out = feed(&mut s, &[4, 4, 1]);
        // Window [2, 2, 4, 4, 1]: top count is 2 and the window is full.
        assert_eq!(out.last(), Some(&Some(2)));
        assert_eq!(s.current(), Some(2));
    }

    #[test]
    fn ties_go_to_the_oldest_distinct_id() {
        let mut s = PredictionSmoother::new();
        // [1, 0, 0, 1]: both count 2, window not full, 1 was seen first.
        let out = feed(&mut s, &[1, 0, 0, 1]);
        assert_eq!(out, vec![None, None, Some(0), Some(1)]);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut s = PredictionSmoother::new();
        feed(&mut s, &[4, 4]);
        s.reset();
        assert_eq!(s.current(), None);
        assert_eq!(s.push(4), None);
    }
}
