//! GStreamer-based decoding of video files and devices into RGB frames

use color_eyre::{eyre::eyre, Result};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use tracing::{debug, info, warn};

use crate::capture::{device, Frame, FrameSource, SourceProperties};
use crate::error::SourceOpenError;

/// Preroll budget while opening; covers demuxer probing of large files.
const PREROLL_TIMEOUT_SECS: u64 = 10;

/// Decodes anything `decodebin` understands. Every frame is delivered, none are dropped.
pub struct GstCapture {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    properties: SourceProperties,
    last_timestamp_ms: Option<f64>,
    released: bool,
}

impl GstCapture {
    /// Build the pipeline and preroll it, so open failures surface here and not mid-stream.
    pub fn open(identifier: &str) -> Result<Self, SourceOpenError> {
        Self::try_open(identifier).map_err(|e| SourceOpenError::new(identifier, e))
    }

    fn try_open(identifier: &str) -> Result<Self> {
        gst::init().map_err(|e| eyre!("Failed to initialize GStreamer: {}", e))?;

        let pipeline_str = Self::build_pipeline_string(identifier);
        info!("Pipeline: {}", pipeline_str);

        let pipeline = gst::parse::launch(&pipeline_str)?
            .downcast::<gst::Pipeline>()
            .map_err(|_| eyre!("Failed to create pipeline"))?;

        let appsink = pipeline
            .by_name("appsink")
            .ok_or_else(|| eyre!("Failed to find appsink element"))?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| eyre!("Failed to cast to AppSink"))?;

        // Analysis needs every frame: block upstream instead of dropping
        appsink.set_property("emit-signals", false);
        appsink.set_property("max-buffers", 4u32);
        appsink.set_property("drop", false);
        appsink.set_property("sync", false);

        // Any early return below must leave the pipeline in NULL
        let guard = NullOnDrop::new(&pipeline);

        pipeline
            .set_state(gst::State::Paused)
            .map_err(|_| eyre!("{}", Self::bus_error(&pipeline)))?;
        let (state_change, _, _) = pipeline.state(Some(gst::ClockTime::from_seconds(
            PREROLL_TIMEOUT_SECS,
        )));
        if state_change.is_err() {
            return Err(eyre!("{}", Self::bus_error(&pipeline)));
        }

        let caps = appsink
            .static_pad("sink")
            .and_then(|pad| pad.current_caps())
            .ok_or_else(|| eyre!("No negotiated caps after preroll"))?;
        let video_info = gst_video::VideoInfo::from_caps(&caps)
            .map_err(|_| eyre!("Failed to parse video info from caps"))?;
        let fps = video_info.fps();
        let fps = if fps.numer() > 0 && fps.denom() > 0 {
            fps.numer() as f64 / fps.denom() as f64
        } else {
            0.0
        };

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| eyre!("Failed to start pipeline: {:?}", e))?;

        // From here on `GstCapture`'s own Drop owns the shutdown
        guard.disarm();

        Ok(Self {
            pipeline,
            appsink,
            properties: SourceProperties {
                identifier: identifier.to_string(),
                width: video_info.width(),
                height: video_info.height(),
                fourcc: caps
                    .structure(0)
                    .and_then(|s| s.get::<String>("format").ok()),
                fps,
            },
            last_timestamp_ms: None,
            released: false,
        })
    }

    fn build_pipeline_string(identifier: &str) -> String {
        let source = match device::device_path(identifier) {
            Some(path) => format!("v4l2src device={}", path),
            None => format!(
                "filesrc location=\"{}\"",
                identifier.replace('\\', "\\\\").replace('"', "\\\"")
            ),
        };

        format!(
            "{} ! decodebin ! \
             videoconvert ! \
             video/x-raw,format=RGB ! \
             appsink name=appsink",
            source
        )
    }

    fn bus_error(pipeline: &gst::Pipeline) -> String {
        pipeline
            .bus()
            .and_then(|bus| {
                bus.timed_pop_filtered(gst::ClockTime::ZERO, &[gst::MessageType::Error])
            })
            .and_then(|msg| match msg.view() {
                gst::MessageView::Error(err) => Some(err.error().to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "pipeline failed to preroll".to_string())
    }

    fn sample_to_frame(&mut self, sample: &gst::Sample) -> Result<Frame> {
        let buffer = sample
            .buffer()
            .ok_or_else(|| eyre!("Sample contains no buffer"))?;
        let caps = sample.caps().ok_or_else(|| eyre!("Sample has no caps"))?;
        let video_info = gst_video::VideoInfo::from_caps(caps)
            .map_err(|_| eyre!("Failed to parse video info from caps"))?;

        let (width, height) = (video_info.width(), video_info.height());
        if (width, height) != (self.properties.width, self.properties.height) {
            return Err(eyre!(
                "Resolution changed from {}x{} to {}x{}",
                self.properties.width,
                self.properties.height,
                width,
                height
            ));
        }

        let map = buffer
            .map_readable()
            .map_err(|_| eyre!("Failed to map buffer"))?;

        // RGB rows are padded to 4 bytes by videoconvert
        let stride = video_info.stride()[0] as usize;
        let row_bytes = width as usize * 3;
        let data = if stride == row_bytes {
            map.as_slice()[..row_bytes * height as usize].to_vec()
        } else {
            map.as_slice()
                .chunks(stride)
                .take(height as usize)
                .flat_map(|row| &row[..row_bytes])
                .copied()
                .collect()
        };

        let frame_interval = if self.properties.fps > 0.0 {
            1000.0 / self.properties.fps
        } else {
            0.0
        };
        let timestamp_ms = buffer
            .pts()
            .map(|pts| pts.nseconds() as f64 / 1_000_000.0)
            .unwrap_or_else(|| {
                self.last_timestamp_ms
                    .map(|last| last + frame_interval)
                    .unwrap_or(0.0)
            });
        self.last_timestamp_ms = Some(timestamp_ms);

        Ok(Frame::new(data, width, height, timestamp_ms)?)
    }
}

impl FrameSource for GstCapture {
    fn properties(&self) -> &SourceProperties {
        &self.properties
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if self.released {
            return None;
        }

        // Errors here are EOS or a decode failure; both end the stream
        let sample = match self.appsink.pull_sample() {
            Ok(sample) => sample,
            Err(_) => {
                debug!("Appsink returned no sample, end of stream");
                return None;
            }
        };

        match self.sample_to_frame(&sample) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Ending stream: {}", e);
                None
            }
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        info!("Stopping GStreamer pipeline");
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!("Failed to stop pipeline: {:?}", e);
        }
    }
}

impl Drop for GstCapture {
    fn drop(&mut self) {
        self.release();
    }
}

/// Sets a pipeline to NULL when dropped, unless disarmed.
struct NullOnDrop(Option<gst::Pipeline>);

impl NullOnDrop {
    fn new(pipeline: &gst::Pipeline) -> Self {
        Self(Some(pipeline.clone()))
    }

    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for NullOnDrop {
    fn drop(&mut self) {
        if let Some(pipeline) = self.0.take() {
            debug!("Resetting pipeline after failed open");
            if let Err(e) = pipeline.set_state(gst::State::Null) {
                warn!("Failed to reset pipeline: {:?}", e);
            }
        }
    }
}
