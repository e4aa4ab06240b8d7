// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Delivery-side reordering for a sink pipeline: holds buffers that
//! arrived ahead of their turn and releases them, per origin, in
//! increasing sequence order. This is where §5's "per-origin, per-sequence
//! chunks appear downstream in strictly increasing chunk order" guarantee
//! is actually enforced — [`EmitSequencer`](super::emit_sequencer::EmitSequencer)
//! only detects when a sequence's chunks are *complete*, it never holds
//! buffers back from the sink.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use streaming_domain::entities::TupleBuffer;
use streaming_domain::value_objects::{OriginId, SequenceNumber};

struct OriginState {
    next_expected: SequenceNumber,
    pending: BTreeMap<SequenceNumber, TupleBuffer>,
}

impl OriginState {
    fn new() -> Self {
        Self { next_expected: SequenceNumber::INITIAL, pending: BTreeMap::new() }
    }
}

/// Per-origin delivery reorder buffer in front of a [`Sink`](streaming_domain::repositories::Sink).
///
/// A sequence number behind `next_expected` is treated as already-delivered
/// or not part of this origin's tracked stream (the window/join trigger
/// paths stamp every emitted buffer with the same placeholder metadata
/// rather than a real per-origin sequence) and is passed straight through
/// rather than held — only a buffer arriving *ahead* of its turn is worth
/// buffering.
pub struct SinkSequencer {
    origins: Mutex<HashMap<OriginId, OriginState>>,
}

impl SinkSequencer {
    pub fn new() -> Self {
        Self { origins: Mutex::new(HashMap::new()) }
    }

    /// Admits `buffer` and returns every buffer (possibly zero, possibly
    /// more than one) now ready for delivery, in sequence order.
    pub fn admit(&self, buffer: TupleBuffer) -> Vec<TupleBuffer> {
        let origin = buffer.metadata().origin_id;
        let seq = buffer.metadata().sequence_number;
        let mut origins = self.origins.lock();
        let state = origins.entry(origin).or_insert_with(OriginState::new);

        if seq < state.next_expected {
            return vec![buffer];
        }
        if seq > state.next_expected {
            state.pending.insert(seq, buffer);
            return Vec::new();
        }

        let mut ready = vec![buffer];
        state.next_expected = state.next_expected.next();
        while let Some(next) = state.pending.remove(&state.next_expected) {
            ready.push(next);
            state.next_expected = state.next_expected.next();
        }
        ready
    }

    pub fn pending_count(&self) -> usize {
        self.origins.lock().values().map(|s| s.pending.len()).sum()
    }
}

impl Default for SinkSequencer {
    fn default() -> Self {
        Self::new()
    }
}
