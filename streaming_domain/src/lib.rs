// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming Domain
//!
//! Pure data model and domain services for the streaming execution core:
//! tuple buffers, tasks, pipelines, slices/windows, and the aggregation
//! contract. This crate has no thread pools, no async runtime, and no
//! logging — it is the part of the engine that is safe to unit-test in
//! isolation and safe to share between the worker pool and the control
//! plane without pulling in either.
//!
//! ## Module Structure
//!
//! - [`error`] — the `EngineError` taxonomy
//! - [`value_objects`] — small, self-validating identifiers and numeric types
//! - [`entities`] — `TupleBuffer`, `Task`, `Pipeline`, `Slice`, `Window`
//! - [`repositories`] — ports the engine implements: `Source`, `Sink`,
//!   `PipelineStageRuntime`, `SliceCache`
//! - [`services`] — the lift/combine/lower aggregation contract

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{
    BufferControlBlock, OperatorKind, Pipeline, PipelineGraph, PipelineStage, ProcessingContext, RefCountedBcb,
    RepinLock, Slice, Task, TupleBuffer, Window,
};
pub use error::EngineError;
pub use value_objects::{
    BufferMetadata, ChunkNumber, OriginId, PipelineId, QueryId, SequenceNumber, SliceBounds, StageId, Watermark,
    WindowDefinition, WorkerCount,
};
