//! Camera Capture Library for Exam Proctoring
//!
//! Provides the frame type consumed by the gaze pipeline and the camera
//! source abstraction the capture loop pulls frames from.
//! Supports:
//! - Replaying image files from a directory (recorded sessions, demos)
//! - Repeating a single still frame (tests, calibration)

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{CameraSource, FrameDirectory, StillFrame};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Frame read failed: {0}")]
    Read(String),

    #[error("Capture timeout")]
    Timeout,

    #[error("Camera not opened")]
    NotOpen,
}

impl CameraError {
    /// Whether the error only affects the current frame.
    ///
    /// The capture loop skips transient failures and keeps going.
    pub fn is_transient(&self) -> bool {
        matches!(self, CameraError::Read(_) | CameraError::Timeout)
    }
}
