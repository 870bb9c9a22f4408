//! Frame quality assessment

use camera_capture::VideoFrame;
use image::GrayImage;
use imageproc::filter::laplacian_filter;
use serde::{Deserialize, Serialize};

use crate::GazeConfig;

/// Per-frame quality verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Frame is sharp and bright enough to analyze
    pub is_clear: bool,
    /// Variance of the discrete Laplacian
    pub sharpness: f64,
    /// Mean luminance (0-255)
    pub brightness: f64,
}

impl QualityAssessment {
    /// Assessment used when analysis of a frame could not complete
    pub fn unclear() -> Self {
        Self {
            is_clear: false,
            sharpness: 0.0,
            brightness: 0.0,
        }
    }
}

/// Rejects blacked-out, blurred, or occluded camera feeds
#[derive(Debug, Clone)]
pub struct FrameQualityAssessor {
    sharpness_threshold: f64,
    brightness_floor: f64,
}

impl FrameQualityAssessor {
    pub fn new(config: &GazeConfig) -> Self {
        Self {
            sharpness_threshold: config.sharpness_threshold,
            brightness_floor: config.brightness_floor,
        }
    }

    /// Assess a decoded frame
    pub fn assess_frame(&self, frame: &VideoFrame) -> QualityAssessment {
        self.assess(&frame.to_luma())
    }

    /// Assess a luminance image
    pub fn assess(&self, gray: &GrayImage) -> QualityAssessment {
        let pixel_count = gray.width() as usize * gray.height() as usize;
        if pixel_count == 0 {
            return QualityAssessment::unclear();
        }

        let brightness =
            gray.pixels().map(|p| p[0] as f64).sum::<f64>() / pixel_count as f64;

        let laplacian = laplacian_filter(gray);
        let (sum, sum_sq) = laplacian.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
            let v = p[0] as f64;
            (s + v, sq + v * v)
        });
        let mean = sum / pixel_count as f64;
        let sharpness = (sum_sq / pixel_count as f64 - mean * mean).max(0.0);

        QualityAssessment {
            is_clear: sharpness > self.sharpness_threshold && brightness > self.brightness_floor,
            sharpness,
            brightness,
        }
    }
}

impl Default for FrameQualityAssessor {
    fn default() -> Self {
        Self::new(&GazeConfig::default())
    }
}
