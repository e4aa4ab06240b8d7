// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Per-buffer metadata carried alongside a `TupleBuffer`: origin,
//! sequence/chunk numbering, the last-chunk flag, and the watermark this
//! buffer's source observed at creation time.

use super::ids::OriginId;
use super::sequence::{ChunkNumber, SequenceNumber};
use super::watermark::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferMetadata {
    pub origin_id: OriginId,
    pub sequence_number: SequenceNumber,
    pub chunk_number: ChunkNumber,
    /// Set on the final chunk of a sequence; until then the sequencer must
    /// keep buffering out-of-order chunks with unknown `last_chunk_number`.
    pub last_chunk: bool,
    pub watermark_ts: Timestamp,
    pub creation_ts_ms: u64,
}

impl BufferMetadata {
    pub fn new(origin_id: OriginId, sequence_number: SequenceNumber, creation_ts_ms: u64) -> Self {
        Self {
            origin_id,
            sequence_number,
            chunk_number: ChunkNumber::FIRST,
            last_chunk: true,
            watermark_ts: 0,
            creation_ts_ms,
        }
    }

    pub fn with_chunk(mut self, chunk_number: ChunkNumber, last_chunk: bool) -> Self {
        self.chunk_number = chunk_number;
        self.last_chunk = last_chunk;
        self
    }

    pub fn with_watermark(mut self, watermark_ts: Timestamp) -> Self {
        self.watermark_ts = watermark_ts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chunk_buffer_defaults_to_last_chunk() {
        let meta = BufferMetadata::new(OriginId::new(1), SequenceNumber::INITIAL, 0);
        assert!(meta.last_chunk);
        assert_eq!(meta.chunk_number, ChunkNumber::FIRST);
    }

    #[test]
    fn multi_chunk_buffer_tracks_position() {
        let meta = BufferMetadata::new(OriginId::new(1), SequenceNumber::INITIAL, 0)
            .with_chunk(ChunkNumber::new(2), false);
        assert!(!meta.last_chunk);
        assert_eq!(meta.chunk_number, ChunkNumber::new(2));
    }
}
