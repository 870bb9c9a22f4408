//! Video frame types and processing

use image::{GrayImage, RgbImage};

use crate::CameraError;

/// Decoded video frame
///
/// Pixel data is row-major and interleaved. Supported layouts are
/// grayscale (1 channel), RGB (3) and RGBA (4).
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Interleaved pixel data (width * height * channels)
    data: Vec<u8>,
    /// Frame width
    width: u32,
    /// Frame height
    height: u32,
    /// Channels per pixel
    channels: u8,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw interleaved pixel data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, CameraError> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(CameraError::Format(format!(
                "unsupported channel count {}",
                channels
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(CameraError::Format(format!(
                "expected {} bytes for {}x{}x{}, got {}",
                expected,
                width,
                height,
                channels,
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            channels,
            timestamp_ns,
            sequence,
        })
    }

    /// Wrap a decoded RGB image
    pub fn from_rgb(image: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            channels: 3,
            timestamp_ns,
            sequence,
        }
    }

    /// Wrap a grayscale image
    pub fn from_gray(image: GrayImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            channels: 1,
            timestamp_ns,
            sequence,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Get pixel at (x, y) as RGB
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = self.channels as usize;
        let idx = (y as usize * self.width as usize + x as usize) * channels;
        let px = &self.data[idx..idx + channels];
        Some(match channels {
            1 => [px[0], px[0], px[0]],
            _ => [px[0], px[1], px[2]],
        })
    }

    /// Convert to 8-bit luminance
    pub fn to_luma(&self) -> GrayImage {
        let gray: Vec<u8> = match self.channels {
            1 => self.data.clone(),
            n => self
                .data
                .chunks_exact(n as usize)
                .map(|pixel| {
                    // Luminance formula: 0.299*R + 0.587*G + 0.114*B
                    let y = pixel[0] as f32 * 0.299
                        + pixel[1] as f32 * 0.587
                        + pixel[2] as f32 * 0.114;
                    y.round().min(255.0) as u8
                })
                .collect(),
        };

        // Length is validated at construction
        GrayImage::from_raw(self.width, self.height, gray)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}
