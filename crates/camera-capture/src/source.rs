//! Camera sources

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::{CameraError, VideoFrame};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// A device yielding discrete frames on demand.
///
/// `open` is called once per capture session. `read_frame` may fail for a
/// single frame without invalidating the source. `release` must be safe to
/// call more than once.
pub trait CameraSource: Send {
    /// Acquire the device
    fn open(&mut self) -> Result<(), CameraError>;

    /// Read the next frame (blocking)
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError>;

    /// Release the device
    fn release(&mut self);

    /// Check if the device is currently held
    fn is_open(&self) -> bool;

    /// Human readable device name for logs
    fn describe(&self) -> String;
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Replays image files from a directory in file-name order, looping forever.
pub struct FrameDirectory {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    sequence: u32,
    open: bool,
}

impl FrameDirectory {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            files: Vec::new(),
            cursor: 0,
            sequence: 0,
            open: false,
        }
    }

    /// Number of frames discovered by `open`
    pub fn frame_count(&self) -> usize {
        self.files.len()
    }
}

impl CameraSource for FrameDirectory {
    fn open(&mut self) -> Result<(), CameraError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", self.dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CameraError::Open(format!(
                "no image files in {}",
                self.dir.display()
            )));
        }

        info!("Opened frame directory {} ({} frames)", self.dir.display(), files.len());
        self.files = files;
        self.cursor = 0;
        self.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        if !self.open {
            return Err(CameraError::NotOpen);
        }

        let path = &self.files[self.cursor];
        self.cursor = (self.cursor + 1) % self.files.len();
        self.sequence = self.sequence.wrapping_add(1);

        let image = image::open(path).map_err(|e| {
            warn!("Failed to decode {}: {}", path.display(), e);
            CameraError::Read(e.to_string())
        })?;

        Ok(VideoFrame::from_rgb(image.to_rgb8(), now_ns(), self.sequence))
    }

    fn release(&mut self) {
        if self.open {
            debug!("Releasing frame directory {}", self.dir.display());
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn describe(&self) -> String {
        format!("frames:{}", self.dir.display())
    }
}

/// Repeats a single frame on every read.
pub struct StillFrame {
    frame: VideoFrame,
    sequence: u32,
    open: bool,
}

impl StillFrame {
    pub fn new(frame: VideoFrame) -> Self {
        Self {
            frame,
            sequence: 0,
            open: false,
        }
    }
}

impl CameraSource for StillFrame {
    fn open(&mut self) -> Result<(), CameraError> {
        self.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        if !self.open {
            return Err(CameraError::NotOpen);
        }
        self.sequence = self.sequence.wrapping_add(1);
        let mut frame = self.frame.clone();
        frame.timestamp_ns = now_ns();
        frame.sequence = self.sequence;
        Ok(frame)
    }

    fn release(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn describe(&self) -> String {
        format!("still:{}x{}", self.frame.width(), self.frame.height())
    }
}
