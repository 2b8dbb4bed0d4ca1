//! Frame sources: everything that turns a file, directory or device into decoded frames.

pub mod decoder;
pub mod device;
pub mod frame;
#[cfg(feature = "gstreamer-pipeline")]
pub mod gst_capture;
pub mod memory;
pub mod sequence;
pub mod v4l2;

use std::fmt;
use std::path::Path;

use tracing::info;

pub use frame::Frame;
pub use frame::PixelFormat;
pub use memory::MemorySource;
pub use sequence::ImageSequenceSource;
pub use v4l2::V4l2Capture;

use crate::error::SourceOpenError;
use crate::{SourceBackend, SourceConfig};

/// Stream properties read once after open. Diagnostic only.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceProperties {
    pub identifier: String,
    pub width: u32,
    pub height: u32,
    pub fourcc: Option<String>,
    pub fps: f64,
}

impl fmt::Display for SourceProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} fourcc={} fps={}",
            self.identifier,
            self.width,
            self.height,
            self.fourcc.as_deref().unwrap_or("?"),
            self.fps
        )
    }
}

/// Capability contract of an opened frame source.
///
/// Opening is the constructor of each implementation. `release` is idempotent and
/// every implementation also releases on drop, so early termination is covered.
pub trait FrameSource {
    fn properties(&self) -> &SourceProperties;

    /// Next decoded frame, or `None` once the stream is exhausted or a read fails.
    fn next_frame(&mut self) -> Option<Frame>;

    fn release(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn properties(&self) -> &SourceProperties {
        (**self).properties()
    }

    fn next_frame(&mut self) -> Option<Frame> {
        (**self).next_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Open the source named by `config.identifier` with the configured backend.
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource + Send>, SourceOpenError> {
    let backend = match config.backend {
        SourceBackend::Auto => detect_backend(&config.identifier),
        other => other,
    };
    info!(identifier = %config.identifier, ?backend, "Opening frame source");

    match backend {
        SourceBackend::Images => Ok(Box::new(ImageSequenceSource::open(
            &config.identifier,
            config.sequence_fps,
        )?)),
        SourceBackend::V4l2 => Ok(Box::new(V4l2Capture::open(config)?)),
        SourceBackend::Gstreamer => open_gstreamer(config),
        SourceBackend::Auto => unreachable!("auto backend is resolved above"),
    }
}

fn detect_backend(identifier: &str) -> SourceBackend {
    if Path::new(identifier).is_dir() {
        SourceBackend::Images
    } else if device::is_device_designator(identifier) {
        SourceBackend::V4l2
    } else {
        SourceBackend::Gstreamer
    }
}

#[cfg(feature = "gstreamer-pipeline")]
fn open_gstreamer(config: &SourceConfig) -> Result<Box<dyn FrameSource + Send>, SourceOpenError> {
    Ok(Box::new(gst_capture::GstCapture::open(&config.identifier)?))
}

#[cfg(not(feature = "gstreamer-pipeline"))]
fn open_gstreamer(config: &SourceConfig) -> Result<Box<dyn FrameSource + Send>, SourceOpenError> {
    Err(SourceOpenError::new(
        &config.identifier,
        "video files need the `gstreamer-pipeline` feature",
    ))
}
