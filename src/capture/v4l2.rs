//! V4L2 camera source with memory-mapped buffers

use std::time::Duration;

use tracing::{info, instrument, warn};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::capture::{decoder, device, Frame, FrameSource, PixelFormat, SourceProperties};
use crate::error::SourceOpenError;
use crate::SourceConfig;

/// Camera source. Timestamps are driver timestamps relative to the first frame.
pub struct V4l2Capture {
    stream: Option<MmapStream<'static>>,
    // The stream maps buffers of this device; it must outlive `stream`.
    _device: Box<Device>,
    properties: SourceProperties,
    format: PixelFormat,
    first_timestamp: Option<Duration>,
}

impl V4l2Capture {
    /// Open the device, negotiate the format and start streaming.
    pub fn open(config: &SourceConfig) -> Result<Self, SourceOpenError> {
        let identifier = config.identifier.as_str();
        let fail = |reason: &dyn ToString| SourceOpenError::new(identifier, reason.to_string());

        let (path, format) = if identifier == "auto" {
            let found =
                device::auto_detect_device().ok_or_else(|| fail(&"no suitable capture device found"))?;
            (found.path, found.format)
        } else {
            let path = device::device_path(identifier)
                .ok_or_else(|| fail(&"not a V4L2 device designator"))?;
            (path, config.format)
        };
        info!("Initializing V4L2 capture: {} ({:?})", path, format);

        let device = Device::with_path(&path).map_err(|e| fail(&e))?;

        // Query capabilities
        let caps = device.query_caps().map_err(|e| fail(&e))?;
        info!("Device: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(fail(&"device doesn't support video capture"));
        }

        // Set format
        let mut fmt = device.format().map_err(|e| fail(&e))?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = match format {
            PixelFormat::Mjpeg | PixelFormat::Yuyv4 => FourCC::new(format.fourcc()),
            other => return Err(fail(&format!("unsupported capture format {other:?}"))),
        };
        // The driver may adjust the size, keep what it granted
        let fmt = device.set_format(&fmt).map_err(|e| fail(&e))?;

        let fps = device
            .params()
            .ok()
            .filter(|p| p.interval.numerator > 0)
            .map(|p| p.interval.denominator as f64 / p.interval.numerator as f64)
            .unwrap_or(0.0);

        let device = Box::new(device);
        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, config.buffer_count)
            .map_err(|e| fail(&e))?;
        info!("Capture stream started with {} buffers", config.buffer_count);

        Ok(Self {
            stream: Some(stream),
            _device: device,
            properties: SourceProperties {
                identifier: identifier.to_string(),
                width: fmt.width,
                height: fmt.height,
                fourcc: fmt.fourcc.str().ok().map(str::to_string),
                fps,
            },
            format,
            first_timestamp: None,
        })
    }
}

impl FrameSource for V4l2Capture {
    fn properties(&self) -> &SourceProperties {
        &self.properties
    }

    #[instrument(skip(self))]
    fn next_frame(&mut self) -> Option<Frame> {
        let stream = self.stream.as_mut()?;

        let (buf, meta) = match stream.next() {
            Ok(next) => next,
            Err(e) => {
                warn!("V4L2 dequeue failed, ending stream: {}", e);
                return None;
            }
        };

        let captured = Duration::from_secs(meta.timestamp.sec as u64)
            + Duration::from_micros(meta.timestamp.usec as u64);
        let first = *self.first_timestamp.get_or_insert(captured);
        let timestamp_ms = captured.saturating_sub(first).as_secs_f64() * 1000.0;

        let (width, height) = (self.properties.width, self.properties.height);
        let bytesused = (meta.bytesused as usize).min(buf.len());
        let rgb = decoder::decode_frame(&buf[..bytesused], self.format, width, height)
            .and_then(|rgb| Frame::new(rgb, width, height, timestamp_ms));

        match rgb {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Dropping stream after bad frame: {}", e);
                None
            }
        }
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            info!("Releasing V4L2 stream {}", self.properties.identifier);
        }
    }
}

impl Drop for V4l2Capture {
    fn drop(&mut self) {
        self.release();
    }
}
