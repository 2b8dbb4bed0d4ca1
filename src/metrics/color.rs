//! RGB to YCbCr conversion.
//!
//! Full-range BT.601 (the JPEG/JFIF convention), evaluated in `f64` without rounding
//! or clipping:
//!
//! ```text
//! Y  = 0.299 R + 0.587 G + 0.114 B
//! Cb = (B - Y) * 0.564 + 128
//! Cr = (R - Y) * 0.713 + 128
//! ```
//!
//! MSE and PSNR values are only comparable between runs using this same transform.

use ndarray::Array2;

use crate::capture::Frame;

pub const KR: f64 = 0.299;
pub const KG: f64 = 0.587;
pub const KB: f64 = 0.114;
pub const CB_SCALE: f64 = 0.564;
pub const CR_SCALE: f64 = 0.713;
pub const CHROMA_OFFSET: f64 = 128.0;

/// Luma and chroma planes, shape `(height, width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct YCbCrPlanes {
    pub y: Array2<f64>,
    pub cb: Array2<f64>,
    pub cr: Array2<f64>,
}

#[inline]
pub fn rgb_to_ycbcr(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let y = KR * r + KG * g + KB * b;
    let cb = (b - y) * CB_SCALE + CHROMA_OFFSET;
    let cr = (r - y) * CR_SCALE + CHROMA_OFFSET;
    (y, cb, cr)
}

/// Convert a packed RGB24 frame into planes of the same size.
pub fn convert(frame: &Frame) -> YCbCrPlanes {
    let shape = (frame.height as usize, frame.width as usize);
    let mut y = Array2::zeros(shape);
    let mut cb = Array2::zeros(shape);
    let mut cr = Array2::zeros(shape);

    let pixels = frame.data.chunks_exact(3);
    let targets = y.iter_mut().zip(cb.iter_mut()).zip(cr.iter_mut());
    for (px, ((y, cb), cr)) in pixels.zip(targets) {
        let (py, pcb, pcr) = rgb_to_ycbcr(px[0] as f64, px[1] as f64, px[2] as f64);
        *y = py;
        *cb = pcb;
        *cr = pcr;
    }

    YCbCrPlanes { y, cb, cr }
}
