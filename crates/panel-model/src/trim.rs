//! Trim window: the `[start, end]` slice of a source used for export and
//! as the playback range while streaming.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Minimum distance between trim start and end, in seconds.
pub const MIN_TRIM_SPAN_SECS: f64 = 0.1;

/// A clamped time range within a source of known duration.
///
/// Invariant: `0 <= start < end <= duration` and `end - start >= 0.1`
/// whenever the duration allows it. Every setter re-establishes the
/// invariant by clamping rather than rejecting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    start: f64,
    end: f64,
    duration: f64,
}

impl TrimWindow {
    /// The whole source.
    pub fn full(duration_secs: f64) -> Self {
        let duration = sanitize_secs(duration_secs);
        Self {
            start: 0.0,
            end: duration,
            duration,
        }
    }

    /// A window clamped into `[0, duration]`.
    pub fn new(start_secs: f64, end_secs: f64, duration_secs: f64) -> Self {
        let mut window = Self::full(duration_secs);
        window.set_end(end_secs);
        window.set_start(start_secs);
        window
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Length of the window in seconds.
    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// Move the start, keeping it within `[0, end - 0.1]`.
    pub fn set_start(&mut self, secs: f64) {
        let upper = (self.end - MIN_TRIM_SPAN_SECS).max(0.0);
        self.start = sanitize_secs(secs).min(upper);
    }

    /// Move the end, keeping it within `[start + 0.1, duration]`.
    pub fn set_end(&mut self, secs: f64) {
        let lower = (self.start + MIN_TRIM_SPAN_SECS).min(self.duration);
        let secs = if secs.is_finite() { secs } else { self.duration };
        self.end = secs.clamp(lower, self.duration);
    }

    /// Whether playback at `position_secs` has reached the end of the window.
    pub fn reached_end(&self, position_secs: f64) -> bool {
        position_secs >= self.end
    }

    /// Whether `position_secs` lies inside `[start, end)`.
    pub fn contains(&self, position_secs: f64) -> bool {
        position_secs >= self.start && position_secs < self.end
    }

    /// Frame indices sampled at `fps`: `floor(start*fps) .. floor(end*fps)`.
    pub fn frame_range(&self, fps: u32) -> Range<u64> {
        let fps = fps.max(1) as f64;
        let first = (self.start * fps).floor() as u64;
        let last = (self.end * fps).floor() as u64;
        first..last.max(first)
    }

    /// Number of frames in [`frame_range`](Self::frame_range).
    pub fn total_frames(&self, fps: u32) -> u64 {
        let range = self.frame_range(fps);
        range.end - range.start
    }
}

fn sanitize_secs(secs: f64) -> f64 {
    if secs.is_finite() {
        secs.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_full_window() {
        let window = TrimWindow::full(10.0);
        assert_eq!(window.start(), 0.0);
        assert_eq!(window.end(), 10.0);
    }

    #[test]
    fn test_start_past_end_is_pulled_back() {
        let mut window = TrimWindow::new(2.0, 4.0, 10.0);
        window.set_start(5.0);
        assert!((window.start() - 3.9).abs() < 1e-9);
        assert_eq!(window.end(), 4.0);
    }

    #[test]
    fn test_end_before_start_is_pushed_forward() {
        let mut window = TrimWindow::new(2.0, 4.0, 10.0);
        window.set_end(1.0);
        assert!((window.end() - 2.1).abs() < 1e-9);
    }

    #[test]
    fn test_end_clamped_to_duration() {
        let window = TrimWindow::new(1.0, 99.0, 10.0);
        assert_eq!(window.end(), 10.0);
    }

    #[test]
    fn test_frame_range_for_two_second_window() {
        let window = TrimWindow::new(2.0, 4.0, 10.0);
        assert_eq!(window.frame_range(30), 60..120);
        assert_eq!(window.total_frames(30), 60);
    }

    #[test]
    fn test_frame_range_floors_fractional_start() {
        let window = TrimWindow::new(0.51, 1.0, 10.0);
        assert_eq!(window.frame_range(10), 5..10);
        assert_eq!(window.total_frames(10), 5);
    }

    #[test]
    fn test_reached_end() {
        let window = TrimWindow::new(1.0, 3.0, 10.0);
        assert!(!window.reached_end(2.99));
        assert!(window.reached_end(3.0));
        assert!(window.contains(1.0));
        assert!(!window.contains(3.0));
    }

    #[derive(Debug, Clone)]
    enum Edit {
        Start(f64),
        End(f64),
    }

    fn edit() -> impl Strategy<Value = Edit> {
        prop_oneof![
            (-5.0f64..40.0).prop_map(Edit::Start),
            (-5.0f64..40.0).prop_map(Edit::End),
        ]
    }

    proptest! {
        #[test]
        fn prop_edits_preserve_invariant(
            duration in 0.1f64..30.0,
            edits in proptest::collection::vec(edit(), 0..20),
        ) {
            let mut window = TrimWindow::full(duration);
            for e in edits {
                match e {
                    Edit::Start(s) => window.set_start(s),
                    Edit::End(s) => window.set_end(s),
                }
                prop_assert!(window.start() >= 0.0);
                prop_assert!(window.end() <= duration);
                prop_assert!(window.end() - window.start() >= MIN_TRIM_SPAN_SECS - 1e-9);
            }
        }

        #[test]
        fn prop_total_frames_matches_floor_formula(
            start in 0.0f64..10.0,
            len in 0.1f64..10.0,
        ) {
            let window = TrimWindow::new(start, start + len, 25.0);
            let expected = (window.end() * 30.0).floor() as u64 - (window.start() * 30.0).floor() as u64;
            prop_assert_eq!(window.total_frames(30), expected);
        }
    }
}
