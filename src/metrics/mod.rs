//! Per-frame metric components. Everything here is pure except the change tracker.

pub mod change;
pub mod color;
pub mod diff;
pub mod psnr;
pub mod timestamp;

pub use change::ChangeEventTracker;
pub use color::YCbCrPlanes;
pub use diff::ChannelMse;
pub use psnr::{Psnr, PSNR_K};
