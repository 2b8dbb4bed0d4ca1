//! Stateful per-frame metric pipeline

pub mod queue;

use std::time::Instant;

use tracing::{debug, info, instrument, trace};

use crate::capture::{Frame, FrameSource};
use crate::metrics::{color, diff, psnr, timestamp, ChangeEventTracker, YCbCrPlanes};
use crate::AnalysisConfig;

pub use queue::run_pipelined;

/// MSE-derived fields of a record. `None` means not computable for this frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MseMetrics {
    pub log10_msey: Option<f64>,
    pub psnr_y: Option<f64>,
    pub diff_msey: Option<f64>,
    pub diff_msey_delta_timestamp_ms: Option<f64>,
    pub diff_mseu: Option<f64>,
    pub diff_msev: Option<f64>,
}

/// One output row.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub frame_num: u64,
    pub timestamp_ms: f64,
    pub delta_timestamp_ms: Option<f64>,
    /// Present exactly when MSE computation is enabled
    pub mse: Option<MseMetrics>,
}

/// State retained between frames.
#[derive(Debug)]
pub struct PipelineState {
    prev_frame: Option<Frame>,
    /// Converted planes of `prev_frame`, kept only while MSE is enabled
    prev_planes: Option<YCbCrPlanes>,
    prev_timestamp_ms: Option<f64>,
    change: ChangeEventTracker,
    frame_num: u64,
}

/// Totals reported when a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineSummary {
    pub frames: u64,
    pub change_events: u64,
}

pub struct MetricPipeline {
    add_mse: bool,
    state: PipelineState,
}

impl MetricPipeline {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            add_mse: config.add_mse,
            state: PipelineState {
                prev_frame: None,
                prev_planes: None,
                prev_timestamp_ms: None,
                change: ChangeEventTracker::new(config.mse_delta),
                frame_num: 0,
            },
        }
    }

    pub fn add_mse(&self) -> bool {
        self.add_mse
    }

    /// Compute the record for `frame`, then make it the previous frame.
    #[instrument(skip_all, fields(frame_num = self.state.frame_num))]
    pub fn step(&mut self, frame: Frame) -> MetricRecord {
        let state = &mut self.state;
        let timestamp_ms = frame.timestamp_ms;
        let delta_timestamp_ms = timestamp::delta(timestamp_ms, state.prev_timestamp_ms);

        let mse = self.add_mse.then(|| {
            let started = Instant::now();
            // Each frame is converted once and reused as the next frame's reference
            let planes = color::convert(&frame);
            let channels = diff::diff_planes(&planes, state.prev_planes.as_ref());
            state.prev_planes = Some(planes);
            ::metrics::histogram!("vqmetrics_diff_time_us")
                .record(started.elapsed().as_micros() as f64);

            let diff_msey = channels.map(|c| c.y);
            let psnr = psnr::psnr(diff_msey);
            let events_before = state.change.events();
            let diff_msey_delta_timestamp_ms = state.change.observe(timestamp_ms, diff_msey);
            if state.change.events() > events_before {
                ::metrics::counter!("vqmetrics_change_events").increment(1);
                trace!(timestamp_ms, "Near-duplicate frame");
            }

            MseMetrics {
                log10_msey: psnr.map(|p| p.log10_mse),
                psnr_y: psnr.map(|p| p.psnr_db),
                diff_msey,
                diff_msey_delta_timestamp_ms,
                diff_mseu: channels.map(|c| c.u),
                diff_msev: channels.map(|c| c.v),
            }
        });

        let record = MetricRecord {
            frame_num: state.frame_num,
            timestamp_ms,
            delta_timestamp_ms,
            mse,
        };

        // Replaces and drops the previous occupant
        state.prev_frame = Some(frame);
        state.prev_timestamp_ms = Some(timestamp_ms);
        state.frame_num += 1;
        ::metrics::counter!("vqmetrics_frames_processed").increment(1);

        record
    }

    /// Pull frames until the source is exhausted, then release it.
    pub fn run<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Vec<MetricRecord> {
        info!("Processing {}", source.properties().identifier);
        let mut records = Vec::new();
        while let Some(frame) = source.next_frame() {
            records.push(self.step(frame));
        }
        source.release();
        debug!("Source exhausted after {} frames", records.len());
        records
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            frames: self.state.frame_num,
            change_events: self.state.change.events(),
        }
    }
}
