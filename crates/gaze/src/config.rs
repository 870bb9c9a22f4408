//! Gaze monitoring configuration

use serde::{Deserialize, Serialize};

/// Gaze monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Continuous non-compliance before the advisory long-timeout fires (seconds)
    pub timeout_seconds: u64,

    /// Continuous non-compliance before a violation is triggered (seconds)
    pub violation_threshold_seconds: u64,

    /// Minimum Laplacian variance for a frame to count as sharp
    pub sharpness_threshold: f64,

    /// Minimum mean luminance (0-255) for a frame to count as lit
    pub brightness_floor: f64,

    /// Maximum vertical offset between eye centers, as a fraction of face height
    pub eye_level_tolerance_fraction: f64,

    /// Cascade file paths (OpenCV Haar XML)
    pub face_cascade_path: Option<String>,
    pub eye_cascade_path: Option<String>,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            violation_threshold_seconds: 10,
            sharpness_threshold: 100.0,
            brightness_floor: 30.0,
            eye_level_tolerance_fraction: 0.10,
            face_cascade_path: None,
            eye_cascade_path: None,
        }
    }
}

impl GazeConfig {
    /// Config used for proctored exam attempts (shorter long-timeout)
    pub fn proctored() -> Self {
        Self {
            timeout_seconds: 15,
            ..Default::default()
        }
    }
}
