use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::vision::Frame;

/// Padding added around a hand's landmarks, in pixels.
const BOX_PADDING: f64 = 10.0;

/// One landmark in normalised frame coordinates (0..1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// Landmark set of a single detected hand (21 points for a full hand).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandLandmarks {
    pub points: Vec<Landmark>,
}

/// Pixel-space bounding box, clamped to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl HandLandmarks {
    /// Padded box around the landmarks for a `width × height` frame, or
    /// `None` when the hand carries no points.
    pub fn bounding_box(&self, width: u32, height: u32) -> Option<BoundingBox> {
        if self.points.is_empty() {
            return None;
        }
        let (w, h) = (width as f64, height as f64);
        let mut bbox = BoundingBox {
            x_min: f64::INFINITY,
            x_max: f64::NEG_INFINITY,
            y_min: f64::INFINITY,
            y_max: f64::NEG_INFINITY,
        };
        for p in &self.points {
            bbox.x_min = bbox.x_min.min(p.x * w);
            bbox.x_max = bbox.x_max.max(p.x * w);
            bbox.y_min = bbox.y_min.min(p.y * h);
            bbox.y_max = bbox.y_max.max(p.y * h);
        }
        bbox.x_min = (bbox.x_min - BOX_PADDING).max(0.0);
        bbox.x_max = (bbox.x_max + BOX_PADDING).min(w);
        bbox.y_min = (bbox.y_min - BOX_PADDING).max(0.0);
        bbox.y_max = (bbox.y_max + BOX_PADDING).min(h);
        Some(bbox)
    }
}

/// What the detector saw in one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandResults {
    pub hands: Vec<HandLandmarks>,
}

impl HandResults {
    pub fn hand_present(&self) -> bool {
        !self.hands.is_empty()
    }

    /// Padded pixel boxes of the hands with landmarks in a `width × height` frame.
    pub fn boxes(&self, width: u32, height: u32) -> Vec<BoundingBox> {
        self.hands.iter().filter_map(|h| h.bounding_box(width, height)).collect()
    }
}

/// Third-party hand-landmark detector. Only its occupancy signal drives the
/// core; landmarks are passed through for visualisation.
pub trait HandDetector: Send {
    /// 1 for single player, 2 when two players share the frame.
    fn set_max_hands(&mut self, max_hands: usize);

    fn send(&mut self, frame: &Frame) -> Result<HandResults>;
}

/// Detector fed by an external tracker (e.g. one running in the browser)
/// that reports how many hands it currently sees through a shared counter.
#[derive(Debug, Clone)]
pub struct ReportedHands {
    max_hands: usize,
    reported: Arc<AtomicUsize>,
}

impl ReportedHands {
    pub fn new(max_hands: usize) -> ReportedHands {
        ReportedHands { max_hands, reported: Arc::new(AtomicUsize::new(0)) }
    }

    /// Counter the tracker writes its hand count into.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reported)
    }

    pub fn max_hands(&self) -> usize {
        self.max_hands
    }
}

impl HandDetector for ReportedHands {
    fn set_max_hands(&mut self, max_hands: usize) {
        self.max_hands = max_hands;
    }

    fn send(&mut self, _frame: &Frame) -> Result<HandResults> {
        let seen = self.reported.load(Ordering::Relaxed).min(self.max_hands);
        Ok(HandResults { hands: vec![HandLandmarks::default(); seen] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_is_padded_and_clamped() {
        let hand = HandLandmarks {
            points: vec![
                Landmark { x: 0.0, y: 0.5, z: 0.0 },
                Landmark { x: 0.5, y: 0.75, z: 0.0 },
            ],
        };
        let bbox = hand.bounding_box(200, 100).unwrap();
        assert_eq!(bbox, BoundingBox { x_min: 0.0, x_max: 110.0, y_min: 40.0, y_max: 85.0 });
        assert!(HandLandmarks::default().bounding_box(200, 100).is_none());

        let results = HandResults { hands: vec![hand, HandLandmarks::default()] };
        assert!(results.hand_present());
        assert_eq!(results.boxes(200, 100), vec![bbox]);
    }

    #[test]
    fn presence_follows_hand_count() {
        assert!(!HandResults::default().hand_present());
        let results = HandResults { hands: vec![HandLandmarks::default()] };
        assert!(results.hand_present());
    }

    #[test]
    fn reported_count_is_capped_by_max_hands() {
        let mut detector = ReportedHands::new(1);
        let counter = detector.counter();
        let frame = Frame::new(2, 2);
        assert!(!detector.send(&frame).unwrap().hand_present());

        counter.store(2, Ordering::Relaxed);
        assert_eq!(detector.send(&frame).unwrap().hands.len(), 1);
        detector.set_max_hands(2);
        assert_eq!(detector.send(&frame).unwrap().hands.len(), 2);
    }
}
