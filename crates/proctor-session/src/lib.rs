//! Proctored Exam Sessions
//!
//! Ties the capture loop, the gaze pipeline and the violation policy to one
//! exam attempt, and submits its result.

pub mod capture;
pub mod config;
pub mod observer;
pub mod session;
pub mod store;

pub use capture::{CaptureEvent, CaptureHandle};
pub use config::{CaptureConfig, ProctorConfig};
pub use observer::{SessionNotice, SessionObserver};
pub use session::{ExamAttempt, ProctoredSession, ProctoringMode, SessionPhase};
pub use store::{ExamResult, JsonlResultStore, MemoryResultStore, ResultStore, StoreError};

use thiserror::Error;

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Failed to start capture worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Result submission failed: {0}")]
    Store(#[from] StoreError),

    #[error("Capture already started for this attempt")]
    CaptureAlreadyStarted,

    #[error("Exam attempt is no longer active")]
    NotActive,
}
