// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The context a pipeline stage's `execute` entry point receives. This is a
//! port: the engine crate supplies the concrete context wired to the buffer
//! pool and task queue; the domain only names the shape a compiled stage
//! needs.

use crate::entities::tuple_buffer::TupleBuffer;
use crate::error::EngineError;
use crate::value_objects::PipelineId;

/// Outcome of one `execute` invocation. A stage that emits zero buffers
/// (e.g. a filter that drops every record) still returns `Produced(0)`, not
/// an error — errors are reserved for genuine failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    Produced(usize),
    Dropped,
}

/// The services available to a compiled pipeline stage while it runs.
/// Implementors live in the engine crate, wired to a specific worker and
/// query.
pub trait ProcessingContext {
    /// Allocates a fresh buffer from the pool for this stage's output.
    /// Blocks under back-pressure ; returns
    /// `EngineError::BufferPoolExhausted` only if the pool is closed.
    fn allocate_buffer(&self) -> Result<TupleBuffer, EngineError>;

    /// Enqueues `buffer` as a follow-up task for `downstream`, via the task
    /// queue (C2). A stage with multiple successors (this pipeline
    /// graph) calls this once per successor; always succeeds once the
    /// buffer is handed off, back-pressure is applied earlier, at
    /// `allocate_buffer`.
    fn emit_buffer(&self, downstream: PipelineId, buffer: TupleBuffer) -> Result<(), EngineError>;

    fn worker_id(&self) -> usize;
}
