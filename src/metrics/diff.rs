use ndarray::Array2;

use crate::capture::Frame;

use super::color::{self, YCbCrPlanes};

/// Per-channel mean squared error between a frame and its predecessor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMse {
    pub y: f64,
    pub u: f64,
    pub v: f64,
}

/// MSE of each plane, `None` when there is no previous frame.
///
/// # Panics
/// If the two frames differ in size. Sources guarantee a fixed resolution.
pub fn diff(curr: &Frame, prev: Option<&Frame>) -> Option<ChannelMse> {
    let prev = prev?;
    assert_eq!(
        (curr.width, curr.height),
        (prev.width, prev.height),
        "frame size changed mid-stream"
    );

    diff_planes(&color::convert(curr), Some(&color::convert(prev)))
}

/// Same as [`diff`] on planes that were already converted.
///
/// # Panics
/// If the plane shapes differ.
pub fn diff_planes(curr: &YCbCrPlanes, prev: Option<&YCbCrPlanes>) -> Option<ChannelMse> {
    let prev = prev?;
    assert_eq!(curr.y.dim(), prev.y.dim(), "frame size changed mid-stream");

    Some(ChannelMse {
        y: plane_mse(&curr.y, &prev.y),
        u: plane_mse(&curr.cb, &prev.cb),
        v: plane_mse(&curr.cr, &prev.cr),
    })
}

fn plane_mse(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    let d = a - b;
    // Empty frames have no pixels to disagree on
    (&d * &d).mean().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn first_frame_has_no_mse() {
        let frame = Frame::solid(4, 4, [10, 20, 30], 0.0);
        assert_eq!(diff(&frame, None), None);
    }

    #[test]
    fn identical_frames_are_exactly_zero() {
        let a = Frame::solid(4, 3, [10, 200, 30], 0.0);
        let b = Frame::solid(4, 3, [10, 200, 30], 33.0);
        assert_eq!(diff(&a, Some(&b)), Some(ChannelMse { y: 0.0, u: 0.0, v: 0.0 }));
    }

    #[test]
    fn constant_luma_offset_squares() {
        let a = Frame::solid(8, 8, [100, 100, 100], 0.0);
        let b = Frame::solid(8, 8, [107, 107, 107], 0.0);
        let mse = diff(&b, Some(&a)).unwrap();
        assert_abs_diff_eq!(mse.y, 49.0, epsilon = 1e-6);
        assert_abs_diff_eq!(mse.u, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(mse.v, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn mean_is_over_all_pixels() {
        // One of four pixels changes by 255 in every channel
        let a = Frame::solid(2, 2, [0, 0, 0], 0.0);
        let mut data = a.data.to_vec();
        data[..3].copy_from_slice(&[255, 255, 255]);
        let b = Frame::new(data, 2, 2, 0.0).unwrap();

        let mse = diff(&b, Some(&a)).unwrap();
        assert_abs_diff_eq!(mse.y, 255.0 * 255.0 / 4.0, epsilon = 1e-6);
    }

    #[test]
    fn results_are_non_negative() {
        let a = Frame::new((0..48).map(|i| (i * 5) as u8).collect::<Vec<_>>(), 4, 4, 0.0).unwrap();
        let b = Frame::new((0..48).map(|i| (255 - i * 3) as u8).collect::<Vec<_>>(), 4, 4, 0.0).unwrap();
        let mse = diff(&a, Some(&b)).unwrap();
        for value in [mse.y, mse.u, mse.v] {
            assert!(value.is_finite() && value > 0.0);
        }
    }

    #[test]
    fn u_is_blue_difference_and_v_is_red_difference() {
        let a = Frame::solid(4, 4, [0, 0, 100], 0.0);
        let b = Frame::solid(4, 4, [0, 0, 200], 0.0);
        let blue = diff(&b, Some(&a)).unwrap();
        // dCb = (100 - 11.4) * 0.564, dCr = -11.4 * 0.713
        assert_abs_diff_eq!(blue.u, (88.6f64 * 0.564).powi(2), epsilon = 1e-6);
        assert_abs_diff_eq!(blue.v, (11.4f64 * 0.713).powi(2), epsilon = 1e-6);

        let a = Frame::solid(4, 4, [100, 0, 0], 0.0);
        let b = Frame::solid(4, 4, [200, 0, 0], 0.0);
        let red = diff(&b, Some(&a)).unwrap();
        assert_abs_diff_eq!(red.v, (70.1f64 * 0.713).powi(2), epsilon = 1e-6);
        assert!(red.u < red.v);
    }

    #[test]
    fn converted_planes_give_the_same_result() {
        let a = Frame::new((0..48).map(|i| (i * 5) as u8).collect::<Vec<_>>(), 4, 4, 0.0).unwrap();
        let b = Frame::new((0..48).map(|i| (255 - i * 3) as u8).collect::<Vec<_>>(), 4, 4, 0.0).unwrap();
        let planes = (color::convert(&a), color::convert(&b));
        assert_eq!(diff_planes(&planes.0, Some(&planes.1)), diff(&a, Some(&b)));
        assert_eq!(diff_planes(&planes.0, None), None);
    }

    #[test]
    #[should_panic(expected = "frame size changed")]
    fn size_mismatch_panics() {
        let a = Frame::solid(2, 2, [0, 0, 0], 0.0);
        let b = Frame::solid(2, 3, [0, 0, 0], 0.0);
        diff(&a, Some(&b));
    }
}
