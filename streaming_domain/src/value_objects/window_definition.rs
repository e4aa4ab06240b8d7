// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Window definitions: tumbling and sliding, both
//! expressed as `(size, slide)` pairs with `size >= slide`.

use super::slice_bounds::SliceAssigner;
use super::watermark::Timestamp;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// A time-based window specification. Tumbling windows are the special case
/// `size_ms == slide_ms`; this mirrors how the original slice assigner treats
/// both as one formula rather than as separate code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDefinition {
    size_ms: u64,
    slide_ms: u64,
    time_field: TimeField,
}

/// Which timestamp a window is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeField {
    EventTime,
    IngestionTime,
}

impl WindowDefinition {
    pub fn tumbling(size_ms: u64, time_field: TimeField) -> Result<Self, EngineError> {
        Self::new(size_ms, size_ms, time_field)
    }

    pub fn sliding(size_ms: u64, slide_ms: u64, time_field: TimeField) -> Result<Self, EngineError> {
        Self::new(size_ms, slide_ms, time_field)
    }

    fn new(size_ms: u64, slide_ms: u64, time_field: TimeField) -> Result<Self, EngineError> {
        if size_ms == 0 || slide_ms == 0 {
            return Err(EngineError::invalid_window_definition(
                "window size and slide must both be positive",
            ));
        }
        if size_ms < slide_ms {
            return Err(EngineError::invalid_window_definition(format!(
                "window size ({size_ms}) must be >= slide ({slide_ms})"
            )));
        }
        Ok(Self {
            size_ms,
            slide_ms,
            time_field,
        })
    }

    pub fn size_ms(&self) -> u64 {
        self.size_ms
    }

    pub fn slide_ms(&self) -> u64 {
        self.slide_ms
    }

    pub fn time_field(&self) -> TimeField {
        self.time_field
    }

    pub fn is_tumbling(&self) -> bool {
        self.size_ms == self.slide_ms
    }

    pub fn slices_per_window(&self) -> u64 {
        self.size_ms / self.slide_ms
    }

    pub fn assigner(&self) -> SliceAssigner {
        SliceAssigner::new(self.size_ms, self.slide_ms)
    }

    pub fn slice_for(&self, ts: Timestamp) -> super::slice_bounds::SliceBounds {
        self.assigner().slice_for(ts)
    }
}
