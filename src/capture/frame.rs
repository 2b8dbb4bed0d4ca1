use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Decoded frame: packed RGB24, row-major, no row padding.
///
/// Cloning is cheap, the pixel data is shared.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Immutable frame data
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    /// Presentation timestamp reported by the source
    pub timestamp_ms: f64,
}

impl Frame {
    pub fn new(
        data: impl Into<Bytes>,
        width: u32,
        height: u32,
        timestamp_ms: f64,
    ) -> Result<Self, FrameError> {
        let data = data.into();
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            timestamp_ms,
        })
    }

    /// Frame filled with a single RGB colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], timestamp_ms: f64) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }

        Self {
            data: Bytes::from(data),
            width,
            height,
            timestamp_ms,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Pixel formats a source may deliver before decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    Yuyv4,
    Mjpeg,
}

impl PixelFormat {
    pub fn fourcc(&self) -> &'static [u8; 4] {
        match self {
            PixelFormat::Rgb24 => b"RGB3",
            PixelFormat::Bgr24 => b"BGR3",
            PixelFormat::Yuyv4 => b"YUYV",
            PixelFormat::Mjpeg => b"MJPG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffer() {
        let err = Frame::new(vec![0u8; 11], 2, 2, 0.0).unwrap_err();
        match err {
            FrameError::BufferSize {
                expected, actual, ..
            } => {
                assert_eq!(expected, 12);
                assert_eq!(actual, 11);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn solid_fills_every_pixel() {
        let frame = Frame::solid(3, 2, [1, 2, 3], 40.0);
        assert_eq!(frame.data.len(), 18);
        assert!(frame.data.chunks(3).all(|px| px == [1, 2, 3]));
        assert_eq!(frame.pixel_count(), 6);
        assert_eq!(frame.timestamp_ms, 40.0);
    }
}
