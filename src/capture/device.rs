use std::path::Path;

use tracing::info;
use v4l::{capability::Flags, video::Capture, Device, FourCC};

use super::frame::PixelFormat;

/// Detected capture device info
#[derive(Debug, Clone, PartialEq)]
pub struct FoundDevice {
    pub path: String,
    pub format: PixelFormat,
}

/// `N`, `/dev/videoN` and `auto` designate a capture device; anything else is a path.
pub fn is_device_designator(identifier: &str) -> bool {
    identifier == "auto" || parse_device_index(identifier).is_some()
}

pub fn parse_device_index(identifier: &str) -> Option<u32> {
    if let Ok(index) = identifier.parse::<u32>() {
        return Some(index);
    }
    identifier
        .strip_prefix("/dev/video")
        .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .and_then(|rest| rest.parse().ok())
}

/// Map a device designator to its `/dev/videoN` path.
pub fn device_path(identifier: &str) -> Option<String> {
    parse_device_index(identifier).map(|index| format!("/dev/video{index}"))
}

/// Auto-detect best capture device
pub fn auto_detect_device() -> Option<FoundDevice> {
    info!("Auto-detecting capture devices...");

    for i in 0..10 {
        let path = format!("/dev/video{}", i);
        if !Path::new(&path).exists() {
            continue;
        }

        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            continue;
        }

        // Prefer devices with MJPEG support
        if let Ok(formats) = dev.enum_formats() {
            for fmt in formats {
                if fmt.fourcc == FourCC::new(b"MJPG") {
                    info!("Found MJPEG device: {} - {}", path, caps.card);
                    return Some(FoundDevice {
                        path,
                        format: PixelFormat::Mjpeg,
                    });
                } else if fmt.fourcc == FourCC::new(b"YUYV") {
                    info!("Found YUYV device: {} - {}", path, caps.card);
                    return Some(FoundDevice {
                        path,
                        format: PixelFormat::Yuyv4,
                    });
                }
            }
        }
    }

    None
}
