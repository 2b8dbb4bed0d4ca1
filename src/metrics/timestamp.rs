/// Time since the previous frame; `None` for the first frame.
pub fn delta(curr_ts: f64, prev_ts: Option<f64>) -> Option<f64> {
    prev_ts.map(|prev| curr_ts - prev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_has_no_delta() {
        assert_eq!(delta(12.5, None), None);
    }

    #[test]
    fn delta_is_signed_difference() {
        assert_eq!(delta(66.0, Some(33.0)), Some(33.0));
        // Non-monotonic sources are reported as-is
        assert_eq!(delta(10.0, Some(40.0)), Some(-30.0));
    }
}
