// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Event-time timestamps and the watermark value object.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds since the epoch, in event time (not wall-clock time).
pub type Timestamp = u64;

/// A timestamp `w` such that no record with event-time `< w` will
/// subsequently arrive.
///
/// `Watermark::ZERO` is the value reported before the first update from
/// every known origin has arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Watermark(pub Timestamp);

impl Watermark {
    pub const ZERO: Watermark = Watermark(0);

    pub fn new(ts: Timestamp) -> Self {
        Self(ts)
    }

    pub fn ts(&self) -> Timestamp {
        self.0
    }

    /// Returns the later of the two watermarks; used when combining a
    /// per-origin advance with the previously published global watermark to
    /// enforce monotonicity at the call site.
    pub fn max(self, other: Watermark) -> Watermark {
        Watermark(self.0.max(other.0))
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::ZERO
    }
}
