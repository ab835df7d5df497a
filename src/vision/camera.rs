use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};

use crate::error::{GestureError, Result};
use crate::vision::Frame;

/// Requested capture settings. `None` leaves the choice to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConstraints {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<u32>,
    pub facing_user: bool,
}

impl CameraConstraints {
    /// Quality tiers tried in order when opening the camera.
    pub fn tiers() -> [CameraConstraints; 3] {
        [
            CameraConstraints { width: Some(224), height: Some(224), frame_rate: Some(30), facing_user: true },
            CameraConstraints { width: Some(224), height: Some(224), frame_rate: Some(15), facing_user: true },
            CameraConstraints { width: None, height: None, frame_rate: None, facing_user: true },
        ]
    }
}

pub trait Camera {
    fn open(&mut self, constraints: &CameraConstraints) -> Result<()>;
    fn capture(&mut self) -> Result<Frame>;
}

/// Opens `camera` with the first tier it accepts and returns that tier.
pub fn open_with_fallbacks(camera: &mut dyn Camera) -> Result<CameraConstraints> {
    let mut failures = Vec::new();
    for tier in CameraConstraints::tiers() {
        match camera.open(&tier) {
            Ok(()) => {
                log::info!("camera opened with {:?}", tier);
                return Ok(tier);
            }
            Err(e) => {
                log::warn!("camera rejected {:?}: {}", tier, e);
                failures.push(e.to_string());
            }
        }
    }
    Err(GestureError::Camera(failures.join("; ")))
}

/// Replays the image files of a directory in file-name order, looping at
/// the end. Frames are resized to the opened tier's width and height.
#[derive(Debug, Clone)]
pub struct ImageDirCamera {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
    size: Option<(u32, u32)>,
}

impl ImageDirCamera {
    pub fn new(dir: impl AsRef<Path>) -> ImageDirCamera {
        ImageDirCamera { dir: dir.as_ref().to_path_buf(), files: Vec::new(), next: 0, size: None }
    }

    pub fn frame_count(&self) -> usize {
        self.files.len()
    }
}

impl Camera for ImageDirCamera {
    fn open(&mut self, constraints: &CameraConstraints) -> Result<()> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| image::ImageFormat::from_path(path).is_ok())
            .collect();
        if files.is_empty() {
            return Err(GestureError::Camera(format!("no images in {:?}", self.dir)));
        }
        files.sort();
        self.files = files;
        self.next = 0;
        self.size = constraints.width.zip(constraints.height);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame> {
        let path = self
            .files
            .get(self.next)
            .ok_or_else(|| GestureError::Camera("camera is not open".into()))?;
        let frame = image::open(path)?.to_rgb8();
        self.next = (self.next + 1) % self.files.len();
        Ok(match self.size {
            Some((w, h)) if frame.dimensions() != (w, h) => imageops::resize(&frame, w, h, FilterType::Nearest),
            _ => frame,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts only constraints without a frame-rate requirement.
    struct PickyCamera {
        attempts: usize,
        accept_any: bool,
    }

    impl Camera for PickyCamera {
        fn open(&mut self, constraints: &CameraConstraints) -> Result<()> {
            self.attempts += 1;
            if self.accept_any && constraints.frame_rate.is_none() {
                Ok(())
            } else {
                Err(GestureError::Camera("overconstrained".into()))
            }
        }

        fn capture(&mut self) -> Result<Frame> {
            Ok(Frame::new(4, 4))
        }
    }

    #[test]
    fn falls_back_to_the_unconstrained_tier() {
        let mut camera = PickyCamera { attempts: 0, accept_any: true };
        let tier = open_with_fallbacks(&mut camera).unwrap();
        assert_eq!(camera.attempts, 3);
        assert_eq!(tier.width, None);
        assert_eq!(camera.capture().unwrap().width(), 4);
    }

    #[test]
    fn gives_up_after_three_tiers() {
        let mut camera = PickyCamera { attempts: 0, accept_any: false };
        let err = open_with_fallbacks(&mut camera).unwrap_err();
        assert!(matches!(err, GestureError::Camera(_)));
        assert_eq!(camera.attempts, 3);
    }

    #[test]
    fn directory_camera_replays_resized_frames() {
        let dir = tempfile::tempdir().unwrap();
        Frame::from_pixel(10, 6, image::Rgb([255, 0, 0])).save(dir.path().join("a.png")).unwrap();
        Frame::from_pixel(8, 8, image::Rgb([0, 0, 255])).save(dir.path().join("b.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut camera = ImageDirCamera::new(dir.path());
        assert!(camera.capture().is_err());
        open_with_fallbacks(&mut camera).unwrap();
        assert_eq!(camera.frame_count(), 2);

        let first = camera.capture().unwrap();
        assert_eq!(first.dimensions(), (224, 224));
        assert_eq!(first.get_pixel(0, 0), &image::Rgb([255, 0, 0]));
        camera.capture().unwrap();
        assert_eq!(camera.capture().unwrap().get_pixel(5, 5), &image::Rgb([255, 0, 0]));
    }

    #[test]
    fn empty_directory_fails_every_tier() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = ImageDirCamera::new(dir.path());
        assert!(matches!(open_with_fallbacks(&mut camera), Err(GestureError::Camera(_))));
    }
}
