//! Gaze Monitoring for Exam Proctoring
//!
//! Real-time exam-taker compliance analysis:
//! - Frame quality gating (sharpness and brightness)
//! - Face detection and eye-level orientation estimate
//! - Violation window and long-timeout tracking

pub mod analysis;
pub mod cascade;
pub mod config;
pub mod detector;
pub mod quality;
pub mod state;

pub use analysis::{GazeResult, GazeStatus, ViolationKind};
pub use cascade::HaarCascade;
pub use config::GazeConfig;
pub use detector::{DetectionParams, FaceObservation, FaceOrientationDetector, ObjectDetector, Rect};
pub use quality::{FrameQualityAssessor, QualityAssessment};
pub use state::{GazeState, GazeStateMachine};

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use camera_capture::VideoFrame;
use thiserror::Error;
use tracing::{info, warn};

/// Gaze monitoring error types
#[derive(Error, Debug)]
pub enum GazeError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Invalid cascade: {0}")]
    CascadeFormat(String),

    #[error("Detection failed: {0}")]
    Detection(String),
}

/// Per-frame pipeline: quality gate, detector, state machine
pub struct GazeMonitor {
    assessor: FrameQualityAssessor,
    detector: FaceOrientationDetector,
    state: GazeStateMachine,
}

impl GazeMonitor {
    pub fn new(config: &GazeConfig, detector: FaceOrientationDetector, now: Instant) -> Self {
        Self {
            assessor: FrameQualityAssessor::new(config),
            detector,
            state: GazeStateMachine::new(config, now),
        }
    }

    /// Build with the Haar cascades named in `config`
    pub fn from_config(config: &GazeConfig) -> Result<Self, GazeError> {
        let detector = FaceOrientationDetector::from_config(config)?;
        Ok(Self::new(config, detector, Instant::now()))
    }

    /// Analyze one frame.
    ///
    /// Unclear frames skip detection. A detector failure, including a panic
    /// in the backend, is logged and the frame is treated as unclear.
    pub fn process(&mut self, frame: &VideoFrame, now: Instant) -> GazeResult {
        let gray = frame.to_luma();
        let quality = self.assessor.assess(&gray);
        if !quality.is_clear {
            return self.state.update(&quality, &FaceObservation::none(), now);
        }

        let detection = panic::catch_unwind(AssertUnwindSafe(|| self.detector.detect(&gray)))
            .unwrap_or_else(|_| Err(GazeError::Detection("detector panicked".into())));

        match detection {
            Ok(face) => self.state.update(&quality, &face, now),
            Err(e) => {
                warn!("Face detection failed on frame {}: {}", frame.sequence, e);
                self.state
                    .update(&QualityAssessment::unclear(), &FaceObservation::none(), now)
            }
        }
    }

    /// Reset tracking state between exam attempts
    pub fn reset(&mut self, now: Instant) {
        self.state.reset(now);
    }

    pub fn state(&self) -> &GazeState {
        self.state.state()
    }
}

/// Whether proctoring can run in this session
pub enum ProctoringCapability {
    /// Detection stack initialized
    Available(GazeMonitor),
    /// Detection stack missing; exams run unproctored
    Unavailable { reason: String },
}

impl ProctoringCapability {
    /// Check the detection stack once at startup
    pub fn initialize(config: &GazeConfig) -> Self {
        match GazeMonitor::from_config(config) {
            Ok(monitor) => {
                info!("Gaze monitoring available");
                ProctoringCapability::Available(monitor)
            }
            Err(e) => {
                warn!("Gaze monitoring unavailable: {}", e);
                ProctoringCapability::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ProctoringCapability::Available(_))
    }
}
