use std::time::{Duration, Instant};

/// Bounds the classification rate independently of the tick rate: once
/// armed, the throttle stays closed until `interval` has passed.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    release_at: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Throttle {
        Throttle { interval, release_at: None }
    }

    pub fn is_throttled(&self, now: Instant) -> bool {
        self.release_at.map_or(false, |at| now < at)
    }

    pub fn arm(&mut self, now: Instant) {
        self.release_at = Some(now + self.interval);
    }

    pub fn release(&mut self) {
        self.release_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopens_after_the_interval() {
        let t0 = Instant::now();
        let mut throttle = Throttle::new(Duration::from_millis(50));
        assert!(!throttle.is_throttled(t0));
        throttle.arm(t0);
        assert!(throttle.is_throttled(t0 + Duration::from_millis(49)));
        assert!(!throttle.is_throttled(t0 + Duration::from_millis(50)));
        throttle.arm(t0);
        throttle.release();
        assert!(!throttle.is_throttled(t0));
    }
}
