// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The multi-origin watermark processor.
//!
//! Each origin gets its own lazily-populated sub-processor that buffers
//! out-of-order `(sequence_number, timestamp)` pairs and advances a prefix
//! watermark once every sequence number up to some point has been seen. The
//! combined watermark is the minimum across origins and stays at zero until
//! every known origin has reported at least once. Per-origin lookup uses
//! `parking_lot::RwLock` over a `HashMap` (see DESIGN.md), since the
//! per-origin count here is small and the lock is only contended at
//! origin-registration time, not on the hot `update` path once origins are
//! known.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use streaming_domain::value_objects::{OriginId, SequenceNumber, Timestamp, Watermark};

/// Per-origin state: the set of `(seq, ts)` updates not yet folded into the
/// prefix watermark, plus the next sequence number expected to extend the
/// prefix.
struct OriginProcessor {
    pending: BTreeMap<SequenceNumber, Timestamp>,
    next_expected: SequenceNumber,
    watermark: Watermark,
}

impl OriginProcessor {
    fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            next_expected: SequenceNumber::INITIAL,
            watermark: Watermark::ZERO,
        }
    }

    fn update(&mut self, seq: SequenceNumber, ts: Timestamp) -> Watermark {
        self.pending.insert(seq, ts);
        while let Some(&ts_for_next) = self.pending.get(&self.next_expected) {
            self.pending.remove(&self.next_expected);
            self.watermark = self.watermark.max(Watermark::new(ts_for_next));
            self.next_expected = self.next_expected.next();
        }
        self.watermark
    }
}

/// Tracks per-origin prefix watermarks and reports `min` across all known
/// origins, 0 until every origin has reported.
pub struct WatermarkProcessor {
    expected_origins: usize,
    per_origin: RwLock<HashMap<OriginId, Mutex<OriginProcessor>>>,
}

impl WatermarkProcessor {
    pub fn new(expected_origins: usize) -> Self {
        Self {
            expected_origins,
            per_origin: RwLock::new(HashMap::new()),
        }
    }

    fn origin_entry(&self, origin: OriginId) -> parking_lot::MappedRwLockReadGuard<'_, Mutex<OriginProcessor>> {
        {
            let read = self.per_origin.read();
            if read.contains_key(&origin) {
                return parking_lot::RwLockReadGuard::map(read, |map| map.get(&origin).unwrap());
            }
        }
        {
            let mut write = self.per_origin.write();
            write.entry(origin).or_insert_with(|| Mutex::new(OriginProcessor::new()));
        }
        let read = self.per_origin.read();
        parking_lot::RwLockReadGuard::map(read, |map| map.get(&origin).unwrap())
    }

    /// Inserts `(seq, ts)` for `origin`, advances that origin's prefix
    /// watermark, and returns the recomputed global watermark.
    pub fn update(&self, origin: OriginId, seq: SequenceNumber, ts: Timestamp) -> Watermark {
        {
            let entry = self.origin_entry(origin);
            entry.lock().update(seq, ts);
        }
        self.current_watermark()
    }

    /// The minimum watermark across all known origins; 0 until
    /// `expected_origins` distinct origins have reported at least once.
    pub fn current_watermark(&self) -> Watermark {
        let per_origin = self.per_origin.read();
        if per_origin.len() < self.expected_origins {
            return Watermark::ZERO;
        }
        per_origin
            .values()
            .map(|p| p.lock().watermark)
            .min()
            .unwrap_or(Watermark::ZERO)
    }

    pub fn known_origin_count(&self) -> usize {
        self.per_origin.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watermark_is_zero_until_every_origin_reports() {
        let processor = WatermarkProcessor::new(2);
        processor.update(OriginId::new(1), SequenceNumber::INITIAL, 10);
        assert_eq!(processor.current_watermark(), Watermark::ZERO);
        processor.update(OriginId::new(2), SequenceNumber::INITIAL, 5);
        assert_eq!(processor.current_watermark(), Watermark::new(5));
    }

    #[test]
    fn global_watermark_is_minimum_across_origins() {
        let processor = WatermarkProcessor::new(2);
        processor.update(OriginId::new(1), SequenceNumber::INITIAL, 100);
        processor.update(OriginId::new(2), SequenceNumber::INITIAL, 20);
        assert_eq!(processor.current_watermark(), Watermark::new(20));
    }

    #[test]
    fn out_of_order_sequence_numbers_only_advance_prefix_watermark() {
        let processor = WatermarkProcessor::new(1);
        let origin = OriginId::new(1);
        processor.update(origin, SequenceNumber::new(2), 20);
        // seq 2 arrived before seq 1: watermark cannot advance past what's
        // contiguous from the start.
        assert_eq!(processor.current_watermark(), Watermark::ZERO);
        processor.update(origin, SequenceNumber::new(1), 10);
        assert_eq!(processor.current_watermark(), Watermark::new(20));
    }

    #[test]
    fn watermark_never_decreases() {
        let processor = WatermarkProcessor::new(1);
        let origin = OriginId::new(1);
        let first = processor.update(origin, SequenceNumber::new(1), 50);
        let second = processor.update(origin, SequenceNumber::new(2), 10);
        assert!(second >= first);
    }
}
