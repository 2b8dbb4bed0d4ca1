use thiserror::Error;

/// The frame source could not be initialized. This is the only fatal error of a run.
#[derive(Debug, Error)]
#[error("failed to open frame source {identifier:?}: {reason}")]
pub struct SourceOpenError {
    pub identifier: String,
    pub reason: String,
}

impl SourceOpenError {
    pub fn new(identifier: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            identifier: identifier.into(),
            reason: reason.to_string(),
        }
    }
}

/// A frame could not be built from a source payload.
///
/// Sources never surface this to the pipeline: a bad frame mid-stream ends the stream.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("buffer holds {actual} bytes, {width}x{height} RGB24 needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("failed to decode {format} payload: {reason}")]
    Decode { format: String, reason: String },
}
