use image::imageops::{self, FilterType};
use serde::{Serialize, Deserialize};

use crate::error::{GestureError, Result};
use crate::vision::Frame;

/// Shape of the tensor a `FeatureExtractor` produces, flattened HWC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl EmbeddingShape {
    pub fn new(height: usize, width: usize, channels: usize) -> EmbeddingShape {
        EmbeddingShape { height, width, channels }
    }

    /// Number of values in one flattened embedding.
    pub fn flat_len(&self) -> usize {
        self.height * self.width * self.channels
    }
}

/// Frozen image network mapping a frame to a fixed-shape embedding.
/// Never trained by this crate.
pub trait FeatureExtractor: Send {
    fn output_shape(&self) -> EmbeddingShape;

    /// Returns exactly `output_shape().flat_len()` values.
    fn embed(&self, frame: &Frame) -> Result<Vec<f64>>;
}

/// Built-in extractor: nearest-neighbour resize to `input_size²`, then
/// average pooling into a `grid × grid × 3` tensor normalised to [0, 1].
#[derive(Debug, Clone)]
pub struct PooledPixelExtractor {
    pub input_size: u32,
    pub grid: u32,
}

impl PooledPixelExtractor {
    pub fn new(input_size: u32, grid: u32) -> PooledPixelExtractor {
        assert!(grid > 0 && grid <= input_size, "grid must be in 1..=input_size");
        PooledPixelExtractor { input_size, grid }
    }
}

impl FeatureExtractor for PooledPixelExtractor {
    fn output_shape(&self) -> EmbeddingShape {
        EmbeddingShape::new(self.grid as usize, self.grid as usize, 3)
    }

    fn embed(&self, frame: &Frame) -> Result<Vec<f64>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(GestureError::Extractor("empty frame".into()));
        }
        let size = self.input_size;
        let resized = imageops::resize(frame, size, size, FilterType::Nearest);

        let grid = self.grid;
        let mut out = Vec::with_capacity(self.output_shape().flat_len());
        for gy in 0..grid {
            let (y0, y1) = (gy * size / grid, (gy + 1) * size / grid);
            for gx in 0..grid {
                let (x0, x1) = (gx * size / grid, (gx + 1) * size / grid);
                let mut sums = [0.0f64; 3];
                for y in y0..y1 {
                    for x in x0..x1 {
                        let px = resized.get_pixel(x, y).0;
                        for c in 0..3 {
                            sums[c] += px[c] as f64;
                        }
                    }
                }
                let count = ((y1 - y0) * (x1 - x0)).max(1) as f64;
                out.extend(sums.iter().map(|s| s / count / 255.0));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn pools_into_grid_cells() {
        // Left half red, right half blue.
        let frame = RgbImage::from_fn(64, 32, |x, _| if x < 32 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) });
        let extractor = PooledPixelExtractor::new(16, 2);
        let embedding = extractor.embed(&frame).unwrap();
        assert_eq!(embedding.len(), extractor.output_shape().flat_len());
        assert_eq!(&embedding[0..3], &[1.0, 0.0, 0.0]);
        assert_eq!(&embedding[3..6], &[0.0, 0.0, 1.0]);
        assert_eq!(&embedding[9..12], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn rejects_empty_frames() {
        let extractor = PooledPixelExtractor::new(16, 2);
        assert!(extractor.embed(&RgbImage::new(0, 0)).is_err());
    }
}
