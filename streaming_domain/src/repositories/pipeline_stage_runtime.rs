// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The three-entry-point lifecycle every compiled pipeline stage implements:
//! a synchronous, buffer-oriented interface where a worker calls `execute`
//! directly on its own OS thread, with no executor indirection in between.

use crate::entities::processing_context::{ExecutionResult, ProcessingContext};
use crate::entities::tuple_buffer::TupleBuffer;
use crate::error::EngineError;
use crate::value_objects::SliceBounds;

/// Compiled code plus operator-handler state behind one pipeline stage.
///
/// `setup` runs once per query and must be idempotent and safe to call
/// before any `execute`; `execute` is reentrant and may be invoked
/// concurrently by multiple workers on distinct buffers; `stop` runs once
/// after the last input sequence has drained.
pub trait PipelineStageRuntime: Send + Sync {
    fn setup(&self, ctx: &dyn ProcessingContext) -> Result<(), EngineError>;

    fn execute(
        &self,
        input: TupleBuffer,
        ctx: &dyn ProcessingContext,
        worker_id: usize,
    ) -> Result<ExecutionResult, EngineError>;

    fn stop(&self, ctx: &dyn ProcessingContext) -> Result<(), EngineError>;

    /// Materializes and emits a completed window.
    /// Only window-bearing stages (aggregation, join builds) override this;
    /// every other stage is never the target of a `Task::TriggerWindow`.
    fn trigger_window(&self, _window: SliceBounds, _ctx: &dyn ProcessingContext) -> Result<ExecutionResult, EngineError> {
        Ok(ExecutionResult::Dropped)
    }
}
