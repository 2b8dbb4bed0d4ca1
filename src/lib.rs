//! Per-frame timing, luma/chroma MSE, PSNR and near-duplicate tracking for video streams.

pub mod capture;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod sink;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use capture::{Frame, FrameSource, PixelFormat, SourceProperties};
pub use error::{FrameError, SourceOpenError};
pub use pipeline::{MetricPipeline, MetricRecord, MseMetrics, PipelineSummary};
pub use sink::MetricTable;

/// Prefix of environment overrides, e.g. `VQMETRICS_ANALYSIS__MSE_DELTA=4`
pub const ENV_PREFIX: &str = "VQMETRICS";

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub analysis: AnalysisConfig,
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
    /// 0 = warnings only, 1 = info, 2 = debug, 3+ = trace
    pub debug: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// File path, device designator (`/dev/videoN`, `N`, `auto`) or image directory
    pub identifier: String,
    pub backend: SourceBackend,
    /// Requested capture size, V4L2 only
    pub width: u32,
    pub height: u32,
    /// Requested capture format, V4L2 only
    pub format: PixelFormat,
    pub buffer_count: u32,
    /// Frame rate assigned to image sequences
    pub sequence_fps: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    Auto,
    Gstreamer,
    V4l2,
    Images,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub add_mse: bool,
    /// Luma MSE below which a frame counts as a near-duplicate
    pub mse_delta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub queue_depth: usize,
    /// Decode on a separate task; off means a plain sequential loop
    pub pipelined: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// CSV destination, stdout when unset
    pub path: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            backend: SourceBackend::Auto,
            width: 640,
            height: 480,
            format: PixelFormat::Mjpeg,
            buffer_count: 4,
            sequence_fps: 30.0,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            add_mse: false,
            mse_delta: 1.0,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_depth: 4,
            pipelined: true,
        }
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then `VQMETRICS_*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
