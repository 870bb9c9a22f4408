//! Gaze compliance tracking over time

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::analysis::{GazeResult, GazeStatus};
use crate::detector::FaceObservation;
use crate::quality::QualityAssessment;
use crate::GazeConfig;

/// Mutable tracking state for one exam attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GazeState {
    /// Last frame the subject was compliant (or the long-timeout clock was reset)
    pub last_compliant_time: Instant,

    /// Long-timeout already signalled since the last compliant frame
    pub warned_for_long_timeout: bool,

    /// Start of the open violation window
    pub violation_window_start: Option<Instant>,
}

impl GazeState {
    pub fn new(now: Instant) -> Self {
        Self {
            last_compliant_time: now,
            warned_for_long_timeout: false,
            violation_window_start: None,
        }
    }
}

/// Turns per-frame observations into compliance results with two timers:
/// an edge-triggered advisory long-timeout, and a violation window that
/// fires once per `violation_threshold` of continuous non-compliance.
#[derive(Debug, Clone)]
pub struct GazeStateMachine {
    state: GazeState,
    timeout: Duration,
    violation_threshold: Duration,
}

impl GazeStateMachine {
    pub fn new(config: &GazeConfig, now: Instant) -> Self {
        Self {
            state: GazeState::new(now),
            timeout: Duration::from_secs(config.timeout_seconds),
            violation_threshold: Duration::from_secs(config.violation_threshold_seconds),
        }
    }

    pub fn state(&self) -> &GazeState {
        &self.state
    }

    /// Restore the initial state (new exam attempt)
    pub fn reset(&mut self, now: Instant) {
        self.state = GazeState::new(now);
    }

    /// Advance with one frame's observations
    pub fn update(
        &mut self,
        quality: &QualityAssessment,
        face: &FaceObservation,
        now: Instant,
    ) -> GazeResult {
        let status = if !quality.is_clear {
            GazeStatus::CameraUnclear
        } else if !face.found {
            // Absence restarts the long-timeout clock instead of feeding it
            self.state.last_compliant_time = now;
            GazeStatus::NoFace
        } else if !face.facing {
            GazeStatus::NotFacing
        } else {
            GazeStatus::ClearAndFacing
        };

        if status.is_compliant() {
            if self.state.violation_window_start.take().is_some() {
                debug!("Subject compliant again, violation window closed");
            }
            self.state.last_compliant_time = now;
            self.state.warned_for_long_timeout = false;
            return GazeResult {
                status,
                is_timeout: false,
                violation_triggered: false,
                violation_type: None,
                violation_duration: 0.0,
                face_box: face.bounding_box,
            };
        }

        let mut is_timeout = false;
        if status != GazeStatus::NoFace
            && !self.state.warned_for_long_timeout
            && now.saturating_duration_since(self.state.last_compliant_time) > self.timeout
        {
            info!("Long non-compliance timeout ({}): {:?}", status.describe(), self.timeout);
            is_timeout = true;
            self.state.warned_for_long_timeout = true;
        }

        let window_start = *self.state.violation_window_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(window_start);

        let (violation_triggered, violation_duration) = if elapsed >= self.violation_threshold {
            info!(
                "Violation triggered: {} for {:.1}s",
                status.describe(),
                elapsed.as_secs_f64()
            );
            self.state.violation_window_start = None;
            (true, 0.0)
        } else {
            (false, elapsed.as_secs_f64())
        };

        GazeResult {
            status,
            is_timeout,
            violation_triggered,
            violation_type: status.violation_kind(),
            violation_duration,
            face_box: face.bounding_box,
        }
    }
}
