use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use vqmetrics::{Config, SourceBackend};

/// Per-frame timing, MSE and PSNR of a video file, capture device or image directory.
#[derive(Debug, Parser)]
#[command(name = "vqmetrics", version, about)]
pub struct Args {
    /// Video file, device (`/dev/video0`, `0`, `auto`) or directory of images
    pub input: String,

    /// Add luma/chroma MSE, PSNR and near-duplicate columns.
    /// `diff_mseu` is the Cb (blue-difference) plane and `diff_msev` the Cr plane.
    #[arg(long = "mse")]
    pub add_mse: bool,

    /// Luma MSE below which a frame counts as a near-duplicate
    #[arg(long)]
    pub mse_delta: Option<f64>,

    /// Verbosity: 0 warnings, 1 info, 2 debug, 3 trace
    #[arg(short, long)]
    pub debug: Option<u8>,

    /// Write the CSV here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Frame rate assigned to image sequences
    #[arg(long)]
    pub fps: Option<f64>,

    /// Frames buffered between decoding and metric computation
    #[arg(long)]
    pub queue_depth: Option<usize>,

    /// Decode and compute on one thread
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Backend {
    Auto,
    Gstreamer,
    V4l2,
    Images,
}

impl From<Backend> for SourceBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Auto => SourceBackend::Auto,
            Backend::Gstreamer => SourceBackend::Gstreamer,
            Backend::V4l2 => SourceBackend::V4l2,
            Backend::Images => SourceBackend::Images,
        }
    }
}

impl Args {
    /// Explicit flags win over file and environment settings.
    pub fn apply(&self, config: &mut Config) {
        config.source.identifier = self.input.clone();
        if self.add_mse {
            config.analysis.add_mse = true;
        }
        if let Some(mse_delta) = self.mse_delta {
            config.analysis.mse_delta = mse_delta;
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if let Some(output) = &self.output {
            config.output.path = Some(output.clone());
        }
        if let Some(backend) = self.backend {
            config.source.backend = backend.into();
        }
        if let Some(fps) = self.fps {
            config.source.sequence_fps = fps;
        }
        if let Some(depth) = self.queue_depth {
            config.pipeline.queue_depth = depth;
        }
        if self.sequential {
            config.pipeline.pipelined = false;
        }
    }
}
