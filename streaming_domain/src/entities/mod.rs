// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Entities: the mutable, identity-bearing objects at the core of the
//! execution model. Unlike [`crate::value_objects`], these carry lifecycle
//! (a `TupleBuffer` is acquired and released; a `Pipeline` is set up once and
//! stopped once) rather than being interchangeable by value.

mod pipeline;
mod pipeline_stage;
mod processing_context;
mod slice;
mod task;
mod tuple_buffer;

pub use pipeline::{Pipeline, PipelineGraph, PipelineRole};
pub use pipeline_stage::{Arity, Comparison, OperatorKind, PipelineStage};
pub use processing_context::{ExecutionResult, ProcessingContext};
pub use slice::{Slice, SlicePayload, Window};
pub use task::Task;
pub use tuple_buffer::{BufferControlBlock, RefCountedBcb, RepinLock, TupleBuffer};
