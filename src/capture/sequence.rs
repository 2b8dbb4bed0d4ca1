//! Directory of still images played back as a fixed-rate stream

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::SourceOpenError;

use super::{Frame, FrameSource, SourceProperties};

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Frames come from image files sorted by name; timestamps follow `fps`.
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    next_index: usize,
    properties: SourceProperties,
    released: bool,
}

impl ImageSequenceSource {
    pub fn open(directory: &str, fps: f64) -> Result<Self, SourceOpenError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(SourceOpenError::new(
                directory,
                format!("sequence fps must be positive, got {fps}"),
            ));
        }

        let entries =
            fs::read_dir(directory).map_err(|e| SourceOpenError::new(directory, e))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        let first = files
            .first()
            .ok_or_else(|| SourceOpenError::new(directory, "no image files found"))?;
        let (width, height) =
            image::image_dimensions(first).map_err(|e| SourceOpenError::new(directory, e))?;

        info!("Image sequence: {} files at {} fps", files.len(), fps);

        Ok(Self {
            files,
            next_index: 0,
            properties: SourceProperties {
                identifier: directory.to_string(),
                width,
                height,
                fourcc: None,
                fps,
            },
            released: false,
        })
    }

    fn load(&self, path: &Path, timestamp_ms: f64) -> Option<Frame> {
        let image = match image::open(path) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                warn!("Failed to decode {}: {}", path.display(), e);
                return None;
            }
        };

        let (width, height) = image.dimensions();
        if (width, height) != (self.properties.width, self.properties.height) {
            warn!(
                "{} is {}x{}, stream is {}x{}; ending sequence",
                path.display(),
                width,
                height,
                self.properties.width,
                self.properties.height
            );
            return None;
        }

        Frame::new(image.into_raw(), width, height, timestamp_ms)
            .map_err(|e| warn!("{}", e))
            .ok()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn properties(&self) -> &SourceProperties {
        &self.properties
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if self.released {
            return None;
        }
        let path = self.files.get(self.next_index)?;
        let timestamp_ms = self.next_index as f64 * 1000.0 / self.properties.fps;
        debug!("Loading {}", path.display());

        let frame = self.load(path, timestamp_ms)?;
        self.next_index += 1;
        Some(frame)
    }

    fn release(&mut self) {
        if !self.released {
            debug!("Releasing image sequence {}", self.properties.identifier);
            self.files.clear();
            self.released = true;
        }
    }
}

impl Drop for ImageSequenceSource {
    fn drop(&mut self) {
        self.release();
    }
}
