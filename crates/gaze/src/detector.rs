//! Face and eye detection, orientation estimate

use camera_capture::VideoFrame;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cascade::HaarCascade;
use crate::{GazeConfig, GazeError};

/// Axis-aligned region in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.y as f64 + self.height as f64 / 2.0
    }

    /// Clip to an image of the given size
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Rect::new(x, y, self.width.min(width - x), self.height.min(height - y))
    }
}

/// Multi-scale detection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Window growth per scale step
    pub scale_factor: f64,
    /// Overlapping hits a region needs to be reported
    pub min_neighbors: u32,
    /// Smallest window considered (width, height)
    pub min_size: (u32, u32),
}

/// Face search parameters
pub const FACE_PARAMS: DetectionParams = DetectionParams {
    scale_factor: 1.1,
    min_neighbors: 5,
    min_size: (30, 30),
};

/// Eye search parameters (inside the face region)
pub const EYE_PARAMS: DetectionParams = DetectionParams {
    scale_factor: 1.1,
    min_neighbors: 5,
    min_size: (20, 20),
};

/// Cascade-style object detector backend
pub trait ObjectDetector: Send {
    /// Detect all object regions in a luminance image
    fn detect_multi_scale(
        &self,
        gray: &GrayImage,
        params: &DetectionParams,
    ) -> Result<Vec<Rect>, GazeError>;
}

/// Result of face and eye detection for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    /// Whether a face was detected
    pub found: bool,

    /// Largest detected face (frame coordinates)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Rect>,

    /// Left and right eye (face-region coordinates)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_pair: Option<(Rect, Rect)>,

    /// Subject is oriented toward the camera
    pub facing: bool,
}

impl FaceObservation {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Locates the subject's face and estimates whether they face the camera.
///
/// Eye symmetry is the gaze proxy: both eyes must be found inside the face
/// and their vertical centers must be level within a fraction of the face
/// height.
pub struct FaceOrientationDetector {
    face: Box<dyn ObjectDetector>,
    eyes: Box<dyn ObjectDetector>,
    eye_level_tolerance: f64,
}

impl FaceOrientationDetector {
    pub fn new(
        face: Box<dyn ObjectDetector>,
        eyes: Box<dyn ObjectDetector>,
        config: &GazeConfig,
    ) -> Self {
        Self {
            face,
            eyes,
            eye_level_tolerance: config.eye_level_tolerance_fraction,
        }
    }

    /// Load Haar cascades from the paths in `config`
    pub fn from_config(config: &GazeConfig) -> Result<Self, GazeError> {
        let face_path = config
            .face_cascade_path
            .as_deref()
            .ok_or_else(|| GazeError::ModelLoad("no face cascade path configured".into()))?;
        let eye_path = config
            .eye_cascade_path
            .as_deref()
            .ok_or_else(|| GazeError::ModelLoad("no eye cascade path configured".into()))?;

        let face = HaarCascade::from_file(face_path)?;
        let eyes = HaarCascade::from_file(eye_path)?;
        info!(
            "Face/eye cascades ready ({} and {} stages)",
            face.stage_count(),
            eyes.stage_count()
        );
        Ok(Self::new(Box::new(face), Box::new(eyes), config))
    }

    /// Detect the subject in a decoded frame
    pub fn detect_frame(&self, frame: &VideoFrame) -> Result<FaceObservation, GazeError> {
        self.detect(&frame.to_luma())
    }

    /// Detect the subject in a luminance image
    pub fn detect(&self, gray: &GrayImage) -> Result<FaceObservation, GazeError> {
        let faces = self.face.detect_multi_scale(gray, &FACE_PARAMS)?;
        // First of equally large faces wins
        let largest = faces
            .into_iter()
            .reduce(|best, f| if f.area() > best.area() { f } else { best });
        let Some(face) = largest else {
            return Ok(FaceObservation::none());
        };
        let face = face.clamp_to(gray.width(), gray.height());
        if face.area() == 0 {
            return Ok(FaceObservation::none());
        }

        let region =
            image::imageops::crop_imm(gray, face.x, face.y, face.width, face.height).to_image();
        let mut eyes = self.eyes.detect_multi_scale(&region, &EYE_PARAMS)?;

        if eyes.len() < 2 {
            debug!("Face at {:?} with {} eye(s)", face, eyes.len());
            return Ok(FaceObservation {
                found: true,
                bounding_box: Some(face),
                eye_pair: None,
                facing: false,
            });
        }

        eyes.sort_by_key(|e| e.x);
        let (left, right) = (eyes[0], eyes[1]);
        let offset = (left.center_y() - right.center_y()).abs();
        let facing = offset < self.eye_level_tolerance * face.height as f64;

        Ok(FaceObservation {
            found: true,
            bounding_box: Some(face),
            eye_pair: Some((left, right)),
            facing,
        })
    }
}
