use crate::error::FrameError;

use super::frame::PixelFormat;

/// Convert a raw capture payload into packed RGB24.
pub fn decode_frame(
    data: &[u8],
    format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, FrameError> {
    match format {
        PixelFormat::Mjpeg => decode_mjpeg(data),
        PixelFormat::Rgb24 => {
            // Already in RGB format
            Ok(data.to_vec())
        }
        PixelFormat::Bgr24 => Ok(data
            .chunks_exact(3)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect()),
        PixelFormat::Yuyv4 => yuyv_to_rgb(data, width, height),
    }
}

#[cfg(feature = "fast-jpeg")]
fn decode_mjpeg(data: &[u8]) -> Result<Vec<u8>, FrameError> {
    let mut decoder = zune_jpeg::JpegDecoder::new(data);
    decoder.decode().map_err(|e| FrameError::Decode {
        format: "MJPEG".into(),
        reason: format!("{e:?}"),
    })
}

#[cfg(all(not(feature = "fast-jpeg"), feature = "baseline-jpeg"))]
fn decode_mjpeg(data: &[u8]) -> Result<Vec<u8>, FrameError> {
    use jpeg_decoder::{Decoder, PixelFormat as JpegFormat};

    let decode_error = |reason: String| FrameError::Decode {
        format: "MJPEG".into(),
        reason,
    };

    let mut decoder = Decoder::new(data);
    let pixels = decoder.decode().map_err(|e| decode_error(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| decode_error("missing image info".into()))?;

    match info.pixel_format {
        JpegFormat::RGB24 => Ok(pixels),
        JpegFormat::L8 => Ok(pixels.iter().flat_map(|&l| [l, l, l]).collect()),
        other => Err(decode_error(format!("unsupported jpeg layout {other:?}"))),
    }
}

#[cfg(not(any(feature = "fast-jpeg", feature = "baseline-jpeg")))]
fn decode_mjpeg(_data: &[u8]) -> Result<Vec<u8>, FrameError> {
    Err(FrameError::Decode {
        format: "MJPEG".into(),
        reason: "built without a JPEG decoder (enable `fast-jpeg` or `baseline-jpeg`)".into(),
    })
}

/// Studio-range BT.601 YUYV (4:2:2) to RGB24.
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let pixels = width as usize * height as usize;
    if data.len() < pixels * 2 || width % 2 != 0 {
        return Err(FrameError::Decode {
            format: "YUYV".into(),
            reason: format!("{} bytes for {width}x{height}", data.len()),
        });
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in data[..pixels * 2].chunks_exact(4) {
        let u = chunk[1] as i32 - 128;
        let v = chunk[3] as i32 - 128;
        for y in [chunk[0], chunk[2]] {
            let c = 298 * (y as i32 - 16);
            rgb.push(clamp((c + 409 * v + 128) >> 8));
            rgb.push(clamp((c - 100 * u - 208 * v + 128) >> 8));
            rgb.push(clamp((c + 516 * u + 128) >> 8));
        }
    }
    Ok(rgb)
}

#[inline]
fn clamp(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
