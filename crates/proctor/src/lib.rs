//! Proctored Exam Runner
//!
//! Runs one exam attempt against recorded frames and reports through the log.

use std::path::PathBuf;
use std::time::Duration;

use camera_capture::FrameDirectory;
use gaze::{GazeResult, GazeStatus, ProctoringCapability};
use proctor_session::observer::{
    warning_details, warning_headline, TERMINATION_DETAILS, TERMINATION_HEADLINE,
};
use proctor_session::{
    ExamAttempt, JsonlResultStore, ProctorConfig, ProctoredSession, SessionNotice,
    SessionObserver, SessionPhase,
};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Reports session events to the log
#[derive(Default)]
pub struct LogObserver {
    last_status: Option<GazeStatus>,
    pub warnings: u32,
}

impl SessionObserver for LogObserver {
    fn on_gaze_status(&mut self, result: &GazeResult) {
        if self.last_status != Some(result.status) {
            info!("Gaze status: {}", result.status.describe());
            self.last_status = Some(result.status);
        }
        debug!(
            "Violation timer {:.1}s, face {:?}",
            result.violation_duration, result.face_box
        );
    }

    fn on_violation_warning(&mut self, reason: &str, count: u32, max: u32) {
        self.warnings += 1;
        warn!("{}", warning_headline(reason));
        warn!("{}", warning_details(count, max));
    }

    fn on_terminated(&mut self, reason: &str, count: u32) {
        error!("{} ({} violations, last: {})", TERMINATION_HEADLINE, count, reason);
        error!("{}", TERMINATION_DETAILS);
    }

    fn on_notice(&mut self, notice: SessionNotice) {
        match notice {
            SessionNotice::ProctoringUnavailable { reason } => {
                warn!("Proctoring unavailable, exam continues unproctored: {}", reason)
            }
            SessionNotice::LongTimeout { status } => {
                info!("Extended non-compliance: {}", status.describe())
            }
            SessionNotice::SubmissionFailed { error } => {
                error!("Failed to submit exam result: {}", error)
            }
        }
    }
}

/// One attempt's parameters
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: ProctorConfig,
    /// Frame directory; the configured capture device when absent
    pub frames: Option<PathBuf>,
    pub exam_id: String,
    pub student: String,
    pub results: PathBuf,
    /// Submit after this long unless terminated earlier
    pub duration: Duration,
    pub score: u32,
}

/// Run one attempt to completion
pub async fn run_attempt(options: RunOptions) -> anyhow::Result<SessionPhase> {
    let RunOptions {
        config,
        frames,
        exam_id,
        student,
        results,
        duration,
        score,
    } = options;

    let capability = ProctoringCapability::initialize(&config.gaze);
    let frames = frames.unwrap_or_else(|| PathBuf::from(&config.capture.device));
    let tick_interval = config.capture.throttle_interval();

    let mut session = ProctoredSession::new(
        ExamAttempt::new(exam_id, student),
        capability,
        config,
        JsonlResultStore::new(results),
        LogObserver::default(),
    );
    session.start_capture(Box::new(FrameDirectory::new(frames)))?;

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let mut ticker = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if session.tick() != SessionPhase::Active {
                    break;
                }
            }
            _ = &mut deadline => {
                info!("Exam time elapsed, submitting");
                session.submit(score)?;
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, submitting");
                session.submit(score)?;
                break;
            }
        }
    }

    info!(
        "Attempt {} finished: {:?}, {} violations",
        session.attempt().attempt_id,
        session.phase(),
        session.violations()
    );
    Ok(session.phase())
}
