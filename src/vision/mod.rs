//! Collaborators around the core: the frozen feature extractor, the hand
//! detector used as an occupancy signal, and camera acquisition.

pub mod camera;
pub mod extractor;
pub mod hands;

/// A captured RGB frame.
pub type Frame = image::RgbImage;

pub use camera::{open_with_fallbacks, Camera, CameraConstraints, ImageDirCamera};
pub use extractor::{EmbeddingShape, FeatureExtractor, PooledPixelExtractor};
pub use hands::{BoundingBox, HandDetector, HandLandmarks, HandResults, Landmark, ReportedHands};
