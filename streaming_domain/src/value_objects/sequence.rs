// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Per-origin sequence and chunk numbering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A per-origin, monotonically increasing unit of work. Usually one source
/// buffer, but a single sequence may fan out into multiple chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    pub const INITIAL: SequenceNumber = SequenceNumber(1);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sub-unit of a sequence. Chunk numbers are 1-based; `chunk_number >= 1`
/// is a `TupleBuffer` invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkNumber(pub u64);

impl ChunkNumber {
    pub const FIRST: ChunkNumber = ChunkNumber(1);

    /// Sentinel used by the sequencer before `last_chunk_number` is known.
    pub const UNKNOWN: ChunkNumber = ChunkNumber(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn is_known(&self) -> bool {
        *self != Self::UNKNOWN
    }
}

impl fmt::Display for ChunkNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_number_starts_at_one() {
        assert_eq!(ChunkNumber::FIRST.0, 1);
        assert!(ChunkNumber::FIRST.is_known());
        assert!(!ChunkNumber::UNKNOWN.is_known());
    }

    #[test]
    fn sequence_number_increments() {
        let s = SequenceNumber::INITIAL;
        assert_eq!(s.next(), SequenceNumber::new(2));
    }
}
