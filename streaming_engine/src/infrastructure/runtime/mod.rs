// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The runtime: buffer pool, task queue, worker pool, pipeline registry, and
//! the windowing/aggregation/join subsystems built on top of them.

pub mod aggregation_engine;
pub mod buffer_pool;
pub mod emit_sequencer;
pub mod join_engine;
pub mod pipeline_runtime;
pub mod processing_context;
pub mod sink_sequencer;
pub mod slice_cache;
pub mod slice_store;
pub mod stop_token;
pub mod task_queue;
pub mod watermark_processor;
pub mod window_operator_handler;
pub mod worker_pool;

pub use aggregation_engine::AggregationEngine;
pub use buffer_pool::BufferPool;
pub use emit_sequencer::EmitSequencer;
pub use join_engine::{HashJoinEngine, JoinType, JoinedPair, NestedLoopJoinEngine};
pub use pipeline_runtime::PipelineRegistry;
pub use processing_context::EngineProcessingContext;
pub use sink_sequencer::SinkSequencer;
pub use slice_cache::{FifoSliceCache, SecondChanceSliceCache};
pub use slice_store::SliceStore;
pub use stop_token::StopToken;
pub use task_queue::TaskQueue;
pub use watermark_processor::WatermarkProcessor;
pub use window_operator_handler::{WindowHandlerRegistry, WindowOperatorHandler};
pub use worker_pool::WorkerPool;
