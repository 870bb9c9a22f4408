//! Session notifications

use gaze::{GazeResult, GazeStatus};

/// One-time informational notices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// Detection stack or camera missing; the exam continues without proctoring
    ProctoringUnavailable { reason: String },
    /// Subject has been non-compliant beyond the long timeout
    LongTimeout { status: GazeStatus },
    /// The zero score could not be stored
    SubmissionFailed { error: String },
}

/// Receives session events on the session thread
pub trait SessionObserver {
    /// Every analyzed frame
    fn on_gaze_status(&mut self, _result: &GazeResult) {}

    /// A violation was counted and the attempt continues
    fn on_violation_warning(&mut self, reason: &str, count: u32, max: u32);

    /// Violation limit reached. Called before the zero score is submitted.
    fn on_terminated(&mut self, reason: &str, count: u32);

    fn on_notice(&mut self, notice: SessionNotice);
}

/// Headline shown with a counted violation
pub fn warning_headline(reason: &str) -> String {
    format!("Proctoring violation detected: {}", reason)
}

pub fn warning_details(count: u32, max: u32) -> String {
    format!(
        "You have {} out of {} allowed violations. If you reach {} violations, \
         your exam will be terminated automatically and you will receive a score of zero.",
        count, max, max
    )
}

pub const TERMINATION_HEADLINE: &str = "Maximum proctoring violations reached";

pub const TERMINATION_DETAILS: &str = "Your exam has been terminated due to too many \
     proctoring violations. You will receive a score of zero for this exam.";
