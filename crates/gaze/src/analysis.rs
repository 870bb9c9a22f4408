//! Gaze analysis results

use serde::{Deserialize, Serialize};

use crate::detector::Rect;

/// Reason a frame is out of compliance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Camera feed too dark or blurred (covered lens?)
    CameraUnclear,

    /// No face in view
    NoFace,

    /// Face visible but turned away
    NotFacing,
}

impl ViolationKind {
    /// User-facing description
    pub fn reason(&self) -> &'static str {
        match self {
            ViolationKind::CameraUnclear => "Camera image is not clear",
            ViolationKind::NoFace => "Face not detected",
            ViolationKind::NotFacing => "Not facing camera directly",
        }
    }
}

/// Per-frame compliance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeStatus {
    ClearAndFacing,
    CameraUnclear,
    NoFace,
    NotFacing,
}

impl GazeStatus {
    pub fn is_compliant(&self) -> bool {
        matches!(self, GazeStatus::ClearAndFacing)
    }

    /// Non-compliance reason, `None` when compliant
    pub fn violation_kind(&self) -> Option<ViolationKind> {
        match self {
            GazeStatus::ClearAndFacing => None,
            GazeStatus::CameraUnclear => Some(ViolationKind::CameraUnclear),
            GazeStatus::NoFace => Some(ViolationKind::NoFace),
            GazeStatus::NotFacing => Some(ViolationKind::NotFacing),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self.violation_kind() {
            Some(kind) => kind.reason(),
            None => "Properly facing camera",
        }
    }
}

/// Complete gaze result for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeResult {
    /// Compliance status
    pub status: GazeStatus,

    /// Advisory long-timeout edge (fires once per non-compliant spell)
    pub is_timeout: bool,

    /// A violation window reached its threshold on this frame
    pub violation_triggered: bool,

    /// Current non-compliance reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation_type: Option<ViolationKind>,

    /// Seconds accumulated in the open violation window
    pub violation_duration: f64,

    /// Detected face (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_box: Option<Rect>,
}

impl GazeResult {
    /// Whether this result must reach the violation policy
    pub fn is_violation(&self) -> bool {
        self.violation_triggered
    }

    /// Violation timer severity for display: 0 idle, 1 counting, 2 warning, 3 critical
    pub fn timer_level(&self, threshold_seconds: u64) -> u8 {
        let elapsed = self.violation_duration;
        let threshold = threshold_seconds as f64;
        if elapsed <= 0.0 {
            0
        } else if elapsed > threshold * 0.7 {
            3
        } else if elapsed > threshold * 0.5 {
            2
        } else {
            1
        }
    }
}
