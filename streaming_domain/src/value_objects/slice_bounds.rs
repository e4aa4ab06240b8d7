// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Slice interval math and the slice-assignment function.
//!
//! Tumbling windows are modeled as the special case `size == slide`, and the
//! "window-start" term handles the partial first window before `ts = size`.

use super::watermark::Timestamp;
use serde::{Deserialize, Serialize};

/// A half-open event-time interval `[start, end)`. Slices tile event-time
/// without gap or overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SliceBounds {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl SliceBounds {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        debug_assert!(start < end, "slice bounds must be non-empty: [{start}, {end})");
        Self { start, end }
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts < self.end
    }

    pub fn overlaps(&self, other: &SliceBounds) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration(&self) -> u64 {
        self.end - self.start
    }
}

/// Computes slice start/end for a `(window_size, window_slide)` pair.
///
/// Requires `window_size >= window_slide` (enforced by `WindowDefinition`'s
/// constructor, not re-checked here since this is called on the hot path).
#[derive(Debug, Clone, Copy)]
pub struct SliceAssigner {
    window_size: u64,
    window_slide: u64,
}

impl SliceAssigner {
    pub fn new(window_size: u64, window_slide: u64) -> Self {
        Self {
            window_size,
            window_slide,
        }
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    pub fn window_slide(&self) -> u64 {
        self.window_slide
    }

    pub fn slice_start(&self, ts: Timestamp) -> Timestamp {
        let prev_slide_start = ts - (ts % self.window_slide);
        let prev_window_start = if ts < self.window_size {
            prev_slide_start
        } else {
            ts - ((ts - self.window_size) % self.window_slide)
        };
        prev_slide_start.max(prev_window_start)
    }

    pub fn slice_end(&self, ts: Timestamp) -> Timestamp {
        let next_slide_end = ts + self.window_slide - (ts % self.window_slide);
        let next_window_end = if ts < self.window_size {
            self.window_size
        } else {
            ts + self.window_slide - ((ts - self.window_size) % self.window_slide)
        };
        next_slide_end.min(next_window_end)
    }

    pub fn slice_for(&self, ts: Timestamp) -> SliceBounds {
        SliceBounds::new(self.slice_start(ts), self.slice_end(ts))
    }

    /// All window start timestamps whose end is `<= watermark` and whose end
    /// is a positive multiple of `window_slide`, covering a slice that ends
    /// at or before `up_to_end` (exclusive lower bound `from_end`). Used by
    /// the window operator handler (C10) to enumerate newly triggerable
    /// windows after a watermark advance.
    pub fn windows_ending_in(&self, from_end_exclusive: Timestamp, up_to_end_inclusive: Timestamp) -> Vec<SliceBounds> {
        let mut windows = Vec::new();
        if self.window_size == 0 {
            return windows;
        }
        let mut end = if from_end_exclusive == 0 {
            self.window_size
        } else {
            // smallest multiple-of-slide-aligned window end strictly greater
            // than from_end_exclusive
            let k = from_end_exclusive / self.window_slide + 1;
            (k * self.window_slide).max(self.window_size)
        };
        while end <= up_to_end_inclusive {
            let start = end.saturating_sub(self.window_size);
            windows.push(SliceBounds::new(start, end));
            end += self.window_slide;
        }
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tumbling_window_tiles_without_gaps() {
        let assigner = SliceAssigner::new(5, 5);
        for ts in 0..20u64 {
            let b = assigner.slice_for(ts);
            assert!(b.contains(ts));
        }
        assert_eq!(assigner.slice_for(0), SliceBounds::new(0, 5));
        assert_eq!(assigner.slice_for(4), SliceBounds::new(0, 5));
        assert_eq!(assigner.slice_for(5), SliceBounds::new(5, 10));
    }

    #[test]
    fn sliding_window_slide_is_size_over_k() {
        // size=10, slide=5: two slices per window, consecutive slices abut.
        let assigner = SliceAssigner::new(10, 5);
        assert_eq!(assigner.slice_for(0), SliceBounds::new(0, 5));
        assert_eq!(assigner.slice_for(5), SliceBounds::new(5, 10));
        assert_eq!(assigner.slice_for(10), SliceBounds::new(10, 15));
        // consecutive slices share boundaries with no overlap
        let a = assigner.slice_for(4);
        let b = assigner.slice_for(5);
        assert_eq!(a.end, b.start);
    }

    #[test]
    fn windows_ending_in_tumbling_fires_once_per_interval() {
        let assigner = SliceAssigner::new(5, 5);
        let windows = assigner.windows_ending_in(0, 10);
        assert_eq!(windows, vec![SliceBounds::new(0, 5), SliceBounds::new(5, 10)]);
    }

    #[test]
    fn windows_ending_in_sliding_fires_k_times_per_interval() {
        // slide = size / 2 -> 2 window completions per `size` interval
        let assigner = SliceAssigner::new(10, 5);
        let windows = assigner.windows_ending_in(0, 10);
        assert_eq!(windows, vec![SliceBounds::new(0, 10)]);
        let windows = assigner.windows_ending_in(0, 20);
        assert_eq!(windows, vec![SliceBounds::new(0, 10), SliceBounds::new(5, 15), SliceBounds::new(10, 20)]);
    }

    #[test]
    fn slice_tiling_property_holds_for_many_timestamps() {
        let assigner = SliceAssigner::new(7, 3);
        for ts in 0..100u64 {
            let b = assigner.slice_for(ts);
            assert!(b.start <= ts && ts < b.end, "ts={ts} bounds={b:?}");
        }
    }

    use proptest::prelude::*;

    proptest! {
        /// For any valid `(size, slide, ts)` triple, the slice `slice_for(ts)`
        /// assigns must actually contain `ts`, regardless of how the window
        /// size and slide are chosen.
        #[test]
        fn slice_for_always_contains_its_timestamp(
            slide in 1u64..50,
            size_multiplier in 1u64..5,
            ts in 0u64..1000,
        ) {
            let size = slide * size_multiplier;
            let assigner = SliceAssigner::new(size, slide);
            let bounds = assigner.slice_for(ts);
            prop_assert!(bounds.contains(ts), "ts={} bounds={:?} size={} slide={}", ts, bounds, size, slide);
            prop_assert!(bounds.start <= bounds.end);
        }

        /// Two timestamps that land in the same slice (as determined by
        /// `slice_start`) always agree on `slice_end` too.
        #[test]
        fn same_slice_start_implies_same_slice_end(
            slide in 1u64..50,
            size_multiplier in 1u64..5,
            ts_a in 0u64..1000,
            ts_b in 0u64..1000,
        ) {
            let size = slide * size_multiplier;
            let assigner = SliceAssigner::new(size, slide);
            if assigner.slice_start(ts_a) == assigner.slice_start(ts_b) {
                prop_assert_eq!(assigner.slice_end(ts_a), assigner.slice_end(ts_b));
            }
        }
    }
}
