// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The emit & chunk sequencer: reconstructs a monotonic
//! per-`(origin, sequence)` chunk stream from work that completes out of
//! order.

use parking_lot::Mutex;
use std::collections::HashMap;
use streaming_domain::error::EngineError;
use streaming_domain::value_objects::{ChunkNumber, OriginId, SequenceNumber};

type SequenceKey = (OriginId, SequenceNumber);

#[derive(Debug, Clone, Copy, Default)]
struct InputChunkState {
    last_chunk_number: ChunkNumber,
    seen_chunks: u64,
}

/// Two fine-grained-locked maps: the input
/// side tracks how many chunks of a sequence have been seen and what the
/// last chunk number is (once known); the output side assigns strictly
/// increasing chunk numbers for downstream emission independent of arrival
/// order.
pub struct EmitSequencer {
    input_chunk_state: Mutex<HashMap<SequenceKey, InputChunkState>>,
    output_chunk_number: Mutex<HashMap<SequenceKey, ChunkNumber>>,
}

impl EmitSequencer {
    pub fn new() -> Self {
        Self {
            input_chunk_state: Mutex::new(HashMap::new()),
            output_chunk_number: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically assigns the next consecutive output chunk number for
    /// `(origin, seq)`, starting at `ChunkNumber::FIRST`.
    pub fn next_chunk(&self, origin: OriginId, seq: SequenceNumber) -> ChunkNumber {
        let mut map = self.output_chunk_number.lock();
        let entry = map.entry((origin, seq)).or_insert(ChunkNumber::new(0));
        *entry = entry.next();
        *entry
    }

    /// Records that `chunk` has arrived for `(origin, seq)`. `is_last`
    /// marks `chunk` as the sequence's final chunk. Returns `true` iff this
    /// call observed the sequence's completion (`seen_chunks ==
    /// last_chunk_number`); the caller must then drop the entries for this
    /// key to bound memory.
    pub fn record_chunk(
        &self,
        origin: OriginId,
        seq: SequenceNumber,
        chunk: ChunkNumber,
        is_last: bool,
    ) -> Result<bool, EngineError> {
        let mut map = self.input_chunk_state.lock();
        let state = map.entry((origin, seq)).or_default();
        if is_last {
            state.last_chunk_number = chunk;
        }
        state.seen_chunks += 1;
        if state.last_chunk_number.is_known() && state.seen_chunks > state.last_chunk_number.0 {
            return Err(EngineError::invariant(format!(
                "seen_chunks ({}) exceeded last_chunk_number ({}) for origin {origin} seq {seq}",
                state.seen_chunks, state.last_chunk_number.0
            )));
        }
        let complete = state.last_chunk_number.is_known() && state.seen_chunks == state.last_chunk_number.0;
        if complete {
            map.remove(&(origin, seq));
        }
        Ok(complete)
    }

    /// Drops the output-side bookkeeping for a completed sequence. Called
    /// alongside the input-side cleanup that `record_chunk` performs
    /// automatically.
    pub fn forget_output(&self, origin: OriginId, seq: SequenceNumber) {
        self.output_chunk_number.lock().remove(&(origin, seq));
    }

    pub fn tracked_sequence_count(&self) -> usize {
        self.input_chunk_state.lock().len()
    }
}

impl Default for EmitSequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_sequence_completes_immediately() {
        let sequencer = EmitSequencer::new();
        let origin = OriginId::new(1);
        let seq = SequenceNumber::INITIAL;
        let complete = sequencer.record_chunk(origin, seq, ChunkNumber::FIRST, true).unwrap();
        assert!(complete);
        assert_eq!(sequencer.tracked_sequence_count(), 0);
    }

    #[test]
    fn multi_chunk_sequence_completes_only_after_last_arrives() {
        let sequencer = EmitSequencer::new();
        let origin = OriginId::new(1);
        let seq = SequenceNumber::INITIAL;
        assert!(!sequencer.record_chunk(origin, seq, ChunkNumber::new(1), false).unwrap());
        assert!(!sequencer.record_chunk(origin, seq, ChunkNumber::new(2), false).unwrap());
        assert!(sequencer.record_chunk(origin, seq, ChunkNumber::new(3), true).unwrap());
    }

    #[test]
    fn out_of_order_chunk_arrival_still_completes_once_all_seen() {
        let sequencer = EmitSequencer::new();
        let origin = OriginId::new(2);
        let seq = SequenceNumber::INITIAL;
        // last chunk (3 of 3) arrives first, announcing the total.
        assert!(!sequencer.record_chunk(origin, seq, ChunkNumber::new(3), true).unwrap());
        assert!(!sequencer.record_chunk(origin, seq, ChunkNumber::new(1), false).unwrap());
        assert!(sequencer.record_chunk(origin, seq, ChunkNumber::new(2), false).unwrap());
    }

    #[test]
    fn next_chunk_assigns_strictly_increasing_numbers() {
        let sequencer = EmitSequencer::new();
        let origin = OriginId::new(1);
        let seq = SequenceNumber::INITIAL;
        assert_eq!(sequencer.next_chunk(origin, seq), ChunkNumber::new(1));
        assert_eq!(sequencer.next_chunk(origin, seq), ChunkNumber::new(2));
        assert_eq!(sequencer.next_chunk(origin, seq), ChunkNumber::new(3));
    }

    #[test]
    fn exceeding_last_chunk_number_is_an_invariant_violation() {
        let sequencer = EmitSequencer::new();
        let origin = OriginId::new(1);
        let seq = SequenceNumber::INITIAL;
        // three non-final chunks arrive before the (inconsistent) last-chunk
        // announcement claims the sequence only had one chunk.
        assert!(!sequencer.record_chunk(origin, seq, ChunkNumber::new(1), false).unwrap());
        assert!(!sequencer.record_chunk(origin, seq, ChunkNumber::new(2), false).unwrap());
        assert!(!sequencer.record_chunk(origin, seq, ChunkNumber::new(3), false).unwrap());
        let err = sequencer.record_chunk(origin, seq, ChunkNumber::new(1), true);
        assert!(err.is_err());
    }
}
