//! Proctored exam attempt

use std::time::{Duration, Instant};

use camera_capture::CameraSource;
use chrono::Utc;
use gaze::{GazeMonitor, GazeResult, ProctoringCapability};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use violation_policy::{PolicyOutcome, ViolationPolicy};

use crate::capture::{CaptureEvent, CaptureHandle};
use crate::config::ProctorConfig;
use crate::observer::{SessionNotice, SessionObserver};
use crate::store::{ExamResult, ResultStore};
use crate::SessionError;

/// Reason recorded when the exam window leaves fullscreen
pub const FULLSCREEN_EXIT_REASON: &str = "Exited fullscreen mode";

/// Identity of one exam attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamAttempt {
    pub attempt_id: Uuid,
    pub exam_id: String,
    pub student: String,
}

impl ExamAttempt {
    pub fn new(exam_id: impl Into<String>, student: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            exam_id: exam_id.into(),
            student: student.into(),
        }
    }
}

/// Lifecycle of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    /// Ended by the violation policy
    Terminated,
    /// Submitted by the student
    Submitted,
}

/// Whether violations can be recorded in this attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProctoringMode {
    Proctored,
    Unproctored { reason: String },
}

/// One proctored exam attempt.
///
/// All policy decisions happen on the thread that calls [`tick`](Self::tick);
/// the capture worker only produces events.
pub struct ProctoredSession<S: ResultStore, O: SessionObserver> {
    attempt: ExamAttempt,
    config: ProctorConfig,
    monitor: Option<GazeMonitor>,
    mode: ProctoringMode,
    policy: ViolationPolicy,
    capture: Option<CaptureHandle>,
    events: Option<mpsc::Receiver<CaptureEvent>>,
    phase: SessionPhase,
    fullscreen_expected: bool,
    store: S,
    observer: O,
}

impl<S: ResultStore, O: SessionObserver> ProctoredSession<S, O> {
    pub fn new(
        attempt: ExamAttempt,
        capability: ProctoringCapability,
        config: ProctorConfig,
        store: S,
        mut observer: O,
    ) -> Self {
        let (monitor, mode) = match capability {
            ProctoringCapability::Available(monitor) => (Some(monitor), ProctoringMode::Proctored),
            ProctoringCapability::Unavailable { reason } => {
                warn!(attempt = %attempt.attempt_id, "Exam running without proctoring: {}", reason);
                observer.on_notice(SessionNotice::ProctoringUnavailable {
                    reason: reason.clone(),
                });
                (None, ProctoringMode::Unproctored { reason })
            }
        };

        info!(
            attempt = %attempt.attempt_id,
            "Starting exam {} for {}", attempt.exam_id, attempt.student
        );

        Self {
            policy: ViolationPolicy::new(&config.policy),
            attempt,
            config,
            monitor,
            mode,
            capture: None,
            events: None,
            phase: SessionPhase::Active,
            fullscreen_expected: false,
            store,
            observer,
        }
    }

    /// Start the capture loop. A no-op when unproctored.
    pub fn start_capture(&mut self, camera: Box<dyn CameraSource>) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Active {
            return Err(SessionError::NotActive);
        }
        if self.capture.is_some() {
            return Err(SessionError::CaptureAlreadyStarted);
        }
        if !self.is_proctored() {
            debug!("Capture not started, session is unproctored");
            return Ok(());
        }
        let Some(monitor) = self.monitor.take() else {
            return Err(SessionError::CaptureAlreadyStarted);
        };

        let (handle, events) = CaptureHandle::spawn(camera, monitor, &self.config.capture)?;
        self.capture = Some(handle);
        self.events = Some(events);
        Ok(())
    }

    /// Drain pending capture events. Never blocks.
    pub fn tick(&mut self) -> SessionPhase {
        self.drain_events();
        self.phase
    }

    fn drain_events(&mut self) {
        while self.phase == SessionPhase::Active {
            let Some(events) = self.events.as_mut() else {
                break;
            };
            match events.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.events = None;
                    self.capture_ended();
                    break;
                }
            }
        }
    }

    /// Channel closed. Unexpected unless `stop_capture` already took the handle.
    fn capture_ended(&mut self) {
        let Some(mut capture) = self.capture.take() else {
            debug!("Capture channel closed");
            return;
        };
        capture.stop();
        if !self.is_proctored() {
            return;
        }

        let reason = "Capture loop stopped unexpectedly".to_string();
        error!(attempt = %self.attempt.attempt_id, "{}", reason);
        self.mode = ProctoringMode::Unproctored {
            reason: reason.clone(),
        };
        self.observer
            .on_notice(SessionNotice::ProctoringUnavailable { reason });
    }

    /// Apply one capture event
    pub fn handle_event(&mut self, event: CaptureEvent) {
        if self.phase != SessionPhase::Active {
            return;
        }
        match event {
            CaptureEvent::Gaze {
                result,
                observed_at,
                ..
            } => self.handle_gaze(&result, observed_at),
            CaptureEvent::CameraUnavailable { reason } => {
                warn!(attempt = %self.attempt.attempt_id, "Camera unavailable: {}", reason);
                self.stop_capture();
                self.mode = ProctoringMode::Unproctored {
                    reason: reason.clone(),
                };
                self.observer
                    .on_notice(SessionNotice::ProctoringUnavailable { reason });
            }
        }
    }

    fn handle_gaze(&mut self, result: &GazeResult, observed_at: Instant) {
        self.observer.on_gaze_status(result);

        if result.is_timeout {
            info!(
                attempt = %self.attempt.attempt_id,
                "Long non-compliance: {}", result.status.describe()
            );
            self.observer.on_notice(SessionNotice::LongTimeout {
                status: result.status,
            });
        }

        if result.violation_triggered {
            let reason = result
                .violation_type
                .map(|kind| kind.reason())
                .unwrap_or("Unknown violation");
            self.report_violation(reason, observed_at);
        }
    }

    /// Mark whether the exam window is expected to stay fullscreen
    pub fn set_fullscreen_expected(&mut self, expected: bool) {
        self.fullscreen_expected = expected;
    }

    /// Periodic fullscreen check.
    ///
    /// Returns `true` when the caller should restore fullscreen.
    pub fn check_fullscreen(&mut self, is_fullscreen: bool, now: Instant) -> bool {
        if is_fullscreen || !self.fullscreen_expected || self.phase != SessionPhase::Active {
            return false;
        }
        if !self.is_proctored() {
            return false;
        }
        self.report_violation(FULLSCREEN_EXIT_REASON, now);
        self.phase == SessionPhase::Active
    }

    /// Record a violation through the policy.
    ///
    /// Returns `None` when the session cannot record violations.
    pub fn report_violation(&mut self, reason: &str, now: Instant) -> Option<PolicyOutcome> {
        if self.phase != SessionPhase::Active || !self.is_proctored() {
            return None;
        }

        let outcome = self.policy.record(reason, now);
        match outcome {
            PolicyOutcome::Counted { count, max } => {
                self.observer.on_violation_warning(reason, count, max);
            }
            PolicyOutcome::LimitReached { count } => self.terminate(reason, count),
            PolicyOutcome::Ignored(suppression) => {
                debug!("Violation not counted ({:?}): {}", suppression, reason);
            }
        }
        Some(outcome)
    }

    fn terminate(&mut self, reason: &str, count: u32) {
        warn!(
            attempt = %self.attempt.attempt_id,
            count,
            "Terminating exam {} after violation: {}", self.attempt.exam_id, reason
        );
        self.phase = SessionPhase::Terminated;
        self.fullscreen_expected = false;
        self.stop_capture();
        self.observer.on_terminated(reason, count);

        let result = ExamResult::terminated(&self.attempt, Utc::now());
        match self.store.submit(&result) {
            Ok(()) => info!(
                attempt = %self.attempt.attempt_id,
                "Submitted zero score for {} due to proctoring violations", self.attempt.student
            ),
            Err(e) => {
                error!(attempt = %self.attempt.attempt_id, "Failed to submit zero score: {}", e);
                self.observer.on_notice(SessionNotice::SubmissionFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    /// Stop capture, then store the score.
    ///
    /// Violations still in flight from the capture loop are recorded first
    /// and may end the attempt instead. On a store failure the attempt stays
    /// active so submission can be retried.
    pub fn submit(&mut self, score: u32) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Active {
            return Err(SessionError::NotActive);
        }
        self.stop_capture();
        if self.phase != SessionPhase::Active {
            return Err(SessionError::NotActive);
        }
        self.fullscreen_expected = false;

        let result = ExamResult::scored(&self.attempt, score, Utc::now());
        self.store.submit(&result)?;
        self.phase = SessionPhase::Submitted;
        info!(
            attempt = %self.attempt.attempt_id,
            violations = self.policy.count(),
            "Exam {} submitted with score {}", self.attempt.exam_id, score
        );
        Ok(())
    }

    /// Stop the capture loop if running, handling the events it still delivers
    pub fn stop_capture(&mut self) {
        let Some(mut capture) = self.capture.take() else {
            return;
        };
        if self.phase != SessionPhase::Active {
            // Nothing left to record, let the worker see the closed channel
            self.events = None;
        }
        capture.request_stop();

        let deadline = Instant::now() + capture.join_timeout();
        while capture.is_running() && Instant::now() < deadline {
            self.drain_events();
            std::thread::sleep(Duration::from_millis(5));
        }
        if !capture.stop() {
            warn!(attempt = %self.attempt.attempt_id, "Camera release still pending");
        }
        self.drain_events();
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| c.is_running())
    }

    pub fn is_proctored(&self) -> bool {
        self.mode == ProctoringMode::Proctored
    }

    pub fn mode(&self) -> &ProctoringMode {
        &self.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn attempt(&self) -> &ExamAttempt {
        &self.attempt
    }

    pub fn violations(&self) -> u32 {
        self.policy.count()
    }

    pub fn policy(&self) -> &ViolationPolicy {
        &self.policy
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
