//! Background capture loop
//!
//! Owns the camera and the gaze pipeline on a dedicated thread and hands
//! results to the session over a bounded channel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use camera_capture::CameraSource;
use gaze::{GazeMonitor, GazeResult};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::config::CaptureConfig;
use crate::SessionError;

/// Message from the capture loop to the session
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// One analyzed frame
    Gaze {
        result: GazeResult,
        observed_at: Instant,
        sequence: u32,
    },
    /// Camera could not be opened; the loop has exited
    CameraUnavailable { reason: String },
}

impl CaptureEvent {
    /// Events that may never be dropped under backpressure
    fn must_deliver(&self) -> bool {
        match self {
            CaptureEvent::Gaze { result, .. } => result.is_violation(),
            CaptureEvent::CameraUnavailable { .. } => true,
        }
    }
}

/// Releases the camera however the worker exits
struct CameraGuard(Box<dyn CameraSource>);

impl Drop for CameraGuard {
    fn drop(&mut self) {
        self.0.release();
        info!("Camera released: {}", self.0.describe());
    }
}

/// Handle to a running capture loop
pub struct CaptureHandle {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl CaptureHandle {
    /// Start the capture loop. The camera is opened on the worker thread.
    pub fn spawn(
        camera: Box<dyn CameraSource>,
        monitor: GazeMonitor,
        config: &CaptureConfig,
    ) -> Result<(Self, mpsc::Receiver<CaptureEvent>), SessionError> {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let running = Arc::new(AtomicBool::new(true));
        let interval = config.throttle_interval();
        let join_timeout = config.join_timeout();

        info!(
            "Starting capture loop on {} at {} fps",
            camera.describe(),
            config.target_fps
        );

        let worker_running = running.clone();
        let worker = std::thread::Builder::new()
            .name("proctor-capture".to_string())
            .spawn(move || {
                run_worker(camera, monitor, tx, worker_running, interval, join_timeout / 2)
            })?;

        Ok((
            Self {
                running,
                worker: Some(worker),
                join_timeout,
            },
            rx,
        ))
    }

    /// Worker still running
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Ask the worker to exit after its current iteration
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn join_timeout(&self) -> Duration {
        self.join_timeout
    }

    /// Signal the worker and wait up to the join timeout.
    ///
    /// Returns `false` if the worker had to be detached.
    pub fn stop(&mut self) -> bool {
        self.request_stop();
        let Some(worker) = self.worker.take() else {
            return true;
        };

        let deadline = Instant::now() + self.join_timeout;
        while !worker.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    "Capture worker did not stop within {:?}, detaching",
                    self.join_timeout
                );
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        if worker.join().is_err() {
            error!("Capture worker panicked");
        }
        info!("Capture loop stopped");
        true
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    mut camera: Box<dyn CameraSource>,
    mut monitor: GazeMonitor,
    tx: mpsc::Sender<CaptureEvent>,
    running: Arc<AtomicBool>,
    interval: Duration,
    flush_timeout: Duration,
) {
    if let Err(e) = camera.open() {
        error!("Failed to open camera {}: {}", camera.describe(), e);
        let _ = tx.try_send(CaptureEvent::CameraUnavailable {
            reason: e.to_string(),
        });
        running.store(false, Ordering::SeqCst);
        return;
    }
    let mut camera = CameraGuard(camera);

    monitor.reset(Instant::now());
    let mut pending = VecDeque::new();

    while running.load(Ordering::SeqCst) {
        match camera.0.read_frame() {
            Ok(frame) => {
                let observed_at = Instant::now();
                let result = monitor.process(&frame, observed_at);
                metrics::counter!("proctor_frames_processed_total").increment(1);

                let event = CaptureEvent::Gaze {
                    result,
                    observed_at,
                    sequence: frame.sequence,
                };
                if !deliver(&tx, &mut pending, event) {
                    debug!("Session receiver dropped, capture loop exiting");
                    break;
                }
            }
            Err(e) if e.is_transient() => {
                debug!("Skipping frame: {}", e);
            }
            Err(e) => {
                warn!("Camera read failed: {}", e);
            }
        }

        std::thread::sleep(interval);
    }

    // Parked violations still reach the session while it drains on stop
    let deadline = Instant::now() + flush_timeout;
    while flush(&tx, &mut pending) && !pending.is_empty() {
        if Instant::now() >= deadline {
            warn!("{} violation events undelivered at shutdown", pending.len());
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Send parked events in order. Returns `false` once the receiver is gone.
fn flush(tx: &mpsc::Sender<CaptureEvent>, pending: &mut VecDeque<CaptureEvent>) -> bool {
    while let Some(event) = pending.pop_front() {
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                pending.push_front(event);
                break;
            }
            Err(TrySendError::Closed(_)) => {
                pending.clear();
                return false;
            }
        }
    }
    true
}

/// Never blocks the loop: routine results are dropped when the session
/// falls behind, violation events are parked and retried in order.
fn deliver(
    tx: &mpsc::Sender<CaptureEvent>,
    pending: &mut VecDeque<CaptureEvent>,
    event: CaptureEvent,
) -> bool {
    if !flush(tx, pending) {
        return false;
    }

    if !pending.is_empty() {
        if event.must_deliver() {
            pending.push_back(event);
        } else {
            metrics::counter!("proctor_frames_dropped_total").increment(1);
        }
        return true;
    }

    match tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            if event.must_deliver() {
                debug!("Channel full, parking violation event");
                pending.push_back(event);
            } else {
                metrics::counter!("proctor_frames_dropped_total").increment(1);
            }
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}
