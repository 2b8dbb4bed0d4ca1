/// Tracks the last near-duplicate frame: one whose luma MSE against its predecessor
/// is below `mse_delta`.
#[derive(Debug, Clone)]
pub struct ChangeEventTracker {
    mse_delta: f64,
    last_event_ts: Option<f64>,
    events: u64,
}

impl ChangeEventTracker {
    pub fn new(mse_delta: f64) -> Self {
        Self {
            mse_delta,
            last_event_ts: None,
            events: 0,
        }
    }

    /// Feed one frame. Returns the time since the previous event when this frame is
    /// itself an event and an earlier one exists.
    pub fn observe(&mut self, curr_ts: f64, diff_msey: Option<f64>) -> Option<f64> {
        match diff_msey {
            Some(mse) if mse < self.mse_delta => {
                self.events += 1;
                let since_last = self.last_event_ts.map(|last| curr_ts - last);
                self.last_event_ts = Some(curr_ts);
                since_last
            }
            _ => None,
        }
    }

    pub fn mse_delta(&self) -> f64 {
        self.mse_delta
    }

    pub fn last_event_ts(&self) -> Option<f64> {
        self.last_event_ts
    }

    /// Frames that qualified as events so far.
    pub fn events(&self) -> u64 {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_mse_is_ignored() {
        let mut tracker = ChangeEventTracker::new(10.0);
        assert_eq!(tracker.observe(0.0, None), None);
        assert_eq!(tracker.last_event_ts(), None);
        assert_eq!(tracker.events(), 0);
    }

    #[test]
    fn first_event_records_without_delta() {
        let mut tracker = ChangeEventTracker::new(10.0);
        assert_eq!(tracker.observe(33.0, Some(0.0)), None);
        assert_eq!(tracker.last_event_ts(), Some(33.0));
    }

    #[test]
    fn delta_between_events_skips_changes() {
        let mut tracker = ChangeEventTracker::new(10.0);
        tracker.observe(33.0, Some(1.0));
        // At the threshold is not below it
        assert_eq!(tracker.observe(66.0, Some(10.0)), None);
        assert_eq!(tracker.last_event_ts(), Some(33.0));
        assert_eq!(tracker.observe(100.0, Some(9.5)), Some(67.0));
        assert_eq!(tracker.last_event_ts(), Some(100.0));
        assert_eq!(tracker.events(), 2);
    }

    #[test]
    fn infinite_mse_never_qualifies() {
        let mut tracker = ChangeEventTracker::new(f64::MAX);
        assert_eq!(tracker.observe(1.0, Some(f64::INFINITY)), None);
        assert_eq!(tracker.events(), 0);
    }
}
