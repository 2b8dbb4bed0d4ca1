use std::collections::VecDeque;

use super::{Frame, FrameSource, SourceProperties};

/// Source over frames already held in memory.
pub struct MemorySource {
    frames: VecDeque<Frame>,
    properties: SourceProperties,
    releases: usize,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        let (width, height) = frames
            .first()
            .map(|f| (f.width, f.height))
            .unwrap_or_default();

        Self {
            frames: frames.into(),
            properties: SourceProperties {
                identifier: "memory".into(),
                width,
                height,
                fourcc: Some("RGB3".into()),
                fps,
            },
            releases: 0,
        }
    }

    /// How many times the source was actually released.
    pub fn releases(&self) -> usize {
        self.releases
    }
}

impl FrameSource for MemorySource {
    fn properties(&self) -> &SourceProperties {
        &self.properties
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if self.releases > 0 {
            return None;
        }
        self.frames.pop_front()
    }

    fn release(&mut self) {
        if self.releases == 0 {
            self.frames.clear();
            self.releases = 1;
        }
    }
}
