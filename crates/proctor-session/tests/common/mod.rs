#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use camera_capture::{CameraError, CameraSource, StillFrame, VideoFrame};
use gaze::{
    DetectionParams, FaceOrientationDetector, GazeConfig, GazeError, GazeMonitor, GazeResult,
    GazeStatus, ObjectDetector, ProctoringCapability, Rect,
};
use image::{GrayImage, Luma};
use proctor_session::{
    CaptureEvent, ExamAttempt, ExamResult, MemoryResultStore, ProctorConfig, ProctoredSession,
    ResultStore, SessionNotice, SessionObserver, StoreError,
};

/// Detector that reports the same rectangles for every image
pub struct Fixed(pub Vec<Rect>);

impl ObjectDetector for Fixed {
    fn detect_multi_scale(
        &self,
        _gray: &GrayImage,
        _params: &DetectionParams,
    ) -> Result<Vec<Rect>, GazeError> {
        Ok(self.0.clone())
    }
}

/// Detector with an indexing bug
pub struct Broken;

impl ObjectDetector for Broken {
    fn detect_multi_scale(
        &self,
        gray: &GrayImage,
        _params: &DetectionParams,
    ) -> Result<Vec<Rect>, GazeError> {
        let pixels = gray.as_raw();
        let last = pixels[pixels.len()];
        Ok(vec![Rect::new(0, 0, last as u32, last as u32)])
    }
}

pub fn sharp_frame() -> VideoFrame {
    let gray = GrayImage::from_fn(64, 48, |x, y| {
        if (x + y) % 2 == 0 {
            Luma([230])
        } else {
            Luma([20])
        }
    });
    VideoFrame::from_gray(gray, 0, 0)
}

pub fn facing_monitor(config: &GazeConfig) -> GazeMonitor {
    let detector = FaceOrientationDetector::new(
        Box::new(Fixed(vec![Rect::new(10, 5, 40, 40)])),
        Box::new(Fixed(vec![Rect::new(5, 10, 10, 10), Rect::new(25, 11, 10, 10)])),
        config,
    );
    GazeMonitor::new(config, detector, Instant::now())
}

pub fn broken_detector_monitor(config: &GazeConfig) -> GazeMonitor {
    let detector =
        FaceOrientationDetector::new(Box::new(Broken), Box::new(Fixed(vec![])), config);
    GazeMonitor::new(config, detector, Instant::now())
}

pub fn empty_room_monitor(config: &GazeConfig) -> GazeMonitor {
    let detector =
        FaceOrientationDetector::new(Box::new(Fixed(vec![])), Box::new(Fixed(vec![])), config);
    GazeMonitor::new(config, detector, Instant::now())
}

#[derive(Default)]
pub struct Recorder {
    pub statuses: usize,
    pub last_status: Option<GazeStatus>,
    pub warnings: Vec<(String, u32, u32)>,
    pub terminations: Vec<(String, u32)>,
    pub notices: Vec<SessionNotice>,
}

impl SessionObserver for Recorder {
    fn on_gaze_status(&mut self, result: &GazeResult) {
        self.statuses += 1;
        self.last_status = Some(result.status);
    }

    fn on_violation_warning(&mut self, reason: &str, count: u32, max: u32) {
        self.warnings.push((reason.to_string(), count, max));
    }

    fn on_terminated(&mut self, reason: &str, count: u32) {
        self.terminations.push((reason.to_string(), count));
    }

    fn on_notice(&mut self, notice: SessionNotice) {
        self.notices.push(notice);
    }
}

/// Store that rejects every submission
pub struct FailingStore;

impl ResultStore for FailingStore {
    fn submit(&mut self, _result: &ExamResult) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub fn proctored_session(
    config: ProctorConfig,
    monitor: GazeMonitor,
) -> ProctoredSession<MemoryResultStore, Recorder> {
    ProctoredSession::new(
        ExamAttempt::new("physics-201", "jdoe"),
        ProctoringCapability::Available(monitor),
        config,
        MemoryResultStore::new(),
        Recorder::default(),
    )
}

pub fn gaze_event(result: GazeResult, observed_at: Instant) -> CaptureEvent {
    CaptureEvent::Gaze {
        result,
        observed_at,
        sequence: 0,
    }
}

pub fn at(start: Instant, secs: f64) -> Instant {
    start + Duration::from_secs_f64(secs)
}

/// Camera wrapper recording release and optionally misbehaving
pub struct TestCamera {
    inner: StillFrame,
    pub released: Arc<AtomicBool>,
    fail_open: bool,
    flaky: bool,
    panic_after: Option<u32>,
    reads: u32,
}

impl TestCamera {
    pub fn new(frame: VideoFrame) -> Self {
        Self {
            inner: StillFrame::new(frame),
            released: Arc::new(AtomicBool::new(false)),
            fail_open: false,
            flaky: false,
            panic_after: None,
            reads: 0,
        }
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Every other read fails transiently
    pub fn flaky(mut self) -> Self {
        self.flaky = true;
        self
    }

    /// Driver crashes on the read after `reads` good frames
    pub fn panicking_after(mut self, reads: u32) -> Self {
        self.panic_after = Some(reads);
        self
    }

    pub fn release_flag(&self) -> Arc<AtomicBool> {
        self.released.clone()
    }
}

impl CameraSource for TestCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        if self.fail_open {
            return Err(CameraError::Open("no video device".to_string()));
        }
        self.inner.open()
    }

    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        self.reads += 1;
        if self.panic_after.is_some_and(|n| self.reads > n) {
            panic!("video driver crashed");
        }
        if self.flaky && self.reads % 2 == 0 {
            return Err(CameraError::Read("dropped frame".to_string()));
        }
        self.inner.read_frame()
    }

    fn release(&mut self) {
        self.inner.release();
        self.released.store(true, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn describe(&self) -> String {
        format!("test:{}", self.inner.describe())
    }
}

/// Tick until `done` holds or the deadline passes
pub fn tick_until<S, O>(
    session: &mut ProctoredSession<S, O>,
    deadline: Duration,
    mut done: impl FnMut(&ProctoredSession<S, O>) -> bool,
) -> bool
where
    S: ResultStore,
    O: SessionObserver,
{
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        session.tick();
        if done(session) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}
