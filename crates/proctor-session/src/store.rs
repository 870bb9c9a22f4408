//! Exam result submission

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::session::ExamAttempt;

/// Result store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Submitted outcome of one exam attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    pub exam_id: String,
    pub student_username: String,
    pub score: u32,
    pub completed_at: DateTime<Utc>,
    /// Attempt ended by the violation policy
    pub terminated_for_violations: bool,
}

impl ExamResult {
    pub fn scored(attempt: &ExamAttempt, score: u32, completed_at: DateTime<Utc>) -> Self {
        Self {
            exam_id: attempt.exam_id.clone(),
            student_username: attempt.student.clone(),
            score,
            completed_at,
            terminated_for_violations: false,
        }
    }

    /// Zero score for an attempt ended by the violation policy
    pub fn terminated(attempt: &ExamAttempt, completed_at: DateTime<Utc>) -> Self {
        Self {
            terminated_for_violations: true,
            ..Self::scored(attempt, 0, completed_at)
        }
    }
}

/// Destination for exam results
pub trait ResultStore: Send {
    fn submit(&mut self, result: &ExamResult) -> Result<(), StoreError>;
}

/// Appends one JSON object per line
pub struct JsonlResultStore {
    path: PathBuf,
}

impl JsonlResultStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultStore for JsonlResultStore {
    fn submit(&mut self, result: &ExamResult) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(result)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;

        info!(
            "Stored result for exam {} ({}): score {}",
            result.exam_id, result.student_username, result.score
        );
        Ok(())
    }
}

/// In-memory store; clones share the same results
#[derive(Clone, Default)]
pub struct MemoryResultStore {
    results: Arc<Mutex<Vec<ExamResult>>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of submitted results
    pub fn results(&self) -> Vec<ExamResult> {
        self.results
            .lock()
            .map(|results| results.clone())
            .unwrap_or_default()
    }
}

impl ResultStore for MemoryResultStore {
    fn submit(&mut self, result: &ExamResult) -> Result<(), StoreError> {
        let mut results = self
            .results
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock error: {}", e)))?;
        results.push(result.clone());
        debug!("Stored result #{} in memory", results.len());
        Ok(())
    }
}
