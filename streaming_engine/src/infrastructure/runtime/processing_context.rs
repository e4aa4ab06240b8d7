// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The concrete [`ProcessingContext`] a worker hands to a compiled pipeline
//! stage: allocation comes from the shared [`BufferPool`],
//! emission goes straight back onto the shared [`TaskQueue`] addressed at
//! whichever downstream pipeline the caller names.

use crate::infrastructure::runtime::buffer_pool::BufferPool;
use crate::infrastructure::runtime::stop_token::StopToken;
use crate::infrastructure::runtime::task_queue::TaskQueue;
use std::sync::Arc;
use streaming_domain::entities::{ProcessingContext, Task, TupleBuffer};
use streaming_domain::error::EngineError;
use streaming_domain::value_objects::{BufferMetadata, OriginId, PipelineId, SequenceNumber};

/// One instance per worker thread per query: binds the shared pool and
/// queue to this worker's id. A single instance serves every pipeline a
/// worker might dispatch into, since a query's graph routes to more than
/// one downstream pipeline.
pub struct EngineProcessingContext {
    worker_id: usize,
    pool: Arc<BufferPool>,
    queue: Arc<TaskQueue>,
    stop: StopToken,
}

impl EngineProcessingContext {
    pub fn new(worker_id: usize, pool: Arc<BufferPool>, queue: Arc<TaskQueue>, stop: StopToken) -> Self {
        Self {
            worker_id,
            pool,
            queue,
            stop,
        }
    }
}

impl ProcessingContext for EngineProcessingContext {
    fn allocate_buffer(&self) -> Result<TupleBuffer, EngineError> {
        // A compiled stage's output metadata is filled in once tuples are
        // written; the placeholder here is overwritten by `emit_buffer`'s
        // caller before the buffer reaches the sequencer.
        let metadata = BufferMetadata::new(OriginId::new(0), SequenceNumber::INITIAL, 0);
        self.pool.acquire(metadata, &self.stop)
    }

    fn emit_buffer(&self, downstream: PipelineId, buffer: TupleBuffer) -> Result<(), EngineError> {
        self.queue.submit_internal(Task::execute_pipeline(downstream, buffer));
        Ok(())
    }

    fn worker_id(&self) -> usize {
        self.worker_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_emit_round_trips_through_the_queue() {
        let pool = BufferPool::new(1, 64);
        let queue = Arc::new(TaskQueue::new(4));
        let stop = StopToken::new();
        let ctx = EngineProcessingContext::new(0, Arc::clone(&pool), Arc::clone(&queue), stop);
        let buf = ctx.allocate_buffer().unwrap();
        ctx.emit_buffer(PipelineId::new(2), buf).unwrap();
        assert_eq!(queue.internal_len(), 1);
        assert_eq!(ctx.worker_id(), 0);
    }
}
