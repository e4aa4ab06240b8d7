// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Ports the engine crate implements: sources, sinks, the pipeline stage
//! runtime lifecycle, and the (hint-only) slice cache.

mod pipeline_stage_runtime;
mod sink;
mod slice_cache;
mod source;

pub use pipeline_stage_runtime::PipelineStageRuntime;
pub use sink::Sink;
pub use slice_cache::{EvictionPolicy, SliceCache};
pub use source::{FillResult, Source, StopSignal};
