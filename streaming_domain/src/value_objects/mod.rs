// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Small, self-validating value objects used throughout the core: origin and
//! sequence identifiers, watermarks, slice bounds, window definitions, and
//! the worker-count configuration value.

mod buffer_metadata;
mod ids;
mod sequence;
mod slice_bounds;
mod watermark;
mod window_definition;
mod worker_count;

pub use buffer_metadata::BufferMetadata;
pub use ids::{OriginId, PipelineId, QueryId, StageId};
pub use sequence::{ChunkNumber, SequenceNumber};
pub use slice_bounds::{SliceAssigner, SliceBounds};
pub use watermark::{Timestamp, Watermark};
pub use window_definition::{TimeField, WindowDefinition};
pub use worker_count::WorkerCount;
