// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The worker pool: `numberOfWorkerThreads` plain OS
//! threads, each pulling tasks from the shared [`TaskQueue`] and dispatching
//! into the relevant pipeline's compiled stage. Not cooperative — there are
//! no coroutine yield points, so every thread here is a genuine
//! `std::thread`, never a tokio task.

use crate::infrastructure::metrics::EngineMetrics;
use crate::infrastructure::runtime::pipeline_runtime::PipelineRegistry;
use crate::infrastructure::runtime::stop_token::StopToken;
use crate::infrastructure::runtime::task_queue::TaskQueue;
use crate::infrastructure::runtime::window_operator_handler::WindowHandlerRegistry;
use std::sync::Arc;
use streaming_domain::entities::{ExecutionResult, ProcessingContext, Task};
use streaming_domain::value_objects::WorkerCount;
use tracing::{error, info, warn};

/// Dispatches one task to its pipeline. A failing task is isolated: its
/// downstream emit is abandoned and the error is reported, but the worker
/// keeps running other tasks.
///
/// After a stateful pipeline (window build, join build) successfully
/// consumes a buffer, `window_handlers` is consulted: a registered handler
/// means this pipeline's buffers drive a watermark, so its close is
/// reported, possibly enqueuing a `Task::TriggerWindow` at the handler's
/// configured target.
fn dispatch(
    task: Task,
    registry: &PipelineRegistry,
    window_handlers: &WindowHandlerRegistry,
    queue: &Arc<TaskQueue>,
    ctx: &dyn ProcessingContext,
    worker_id: usize,
    metrics: &EngineMetrics,
) {
    metrics.record_task_executed();
    match task {
        Task::ExecutePipeline { pipeline_id, buffer } => {
            let Some(runtime) = registry.get(pipeline_id) else {
                warn!(?pipeline_id, "dispatched to unknown pipeline; dropping task");
                return;
            };
            let metadata = *buffer.metadata();
            match runtime.execute(buffer, ctx, worker_id) {
                Ok(ExecutionResult::Produced(n)) => {
                    tracing::trace!(?pipeline_id, worker_id, n, "pipeline stage produced output");
                    metrics.record_buffers_produced(n as u64);
                }
                Ok(ExecutionResult::Dropped) => {}
                Err(err) => {
                    error!(?pipeline_id, worker_id, %err, "pipeline execution failed");
                    metrics.record_pipeline_error();
                    return;
                }
            }
            if let Some(handler) = window_handlers.get(pipeline_id) {
                handler.on_buffer_closed(metadata.origin_id, metadata.sequence_number, metadata.watermark_ts, queue);
            }
        }
        Task::TriggerWindow { pipeline_id, window, .. } => {
            let Some(runtime) = registry.get(pipeline_id) else {
                warn!(?pipeline_id, "window trigger for unknown pipeline; dropping task");
                return;
            };
            match runtime.trigger_window(window, ctx) {
                Ok(ExecutionResult::Produced(n)) => {
                    tracing::trace!(?pipeline_id, worker_id, n, "window trigger produced output");
                    metrics.record_buffers_produced(n as u64);
                }
                Ok(ExecutionResult::Dropped) => {}
                Err(err) => {
                    error!(?pipeline_id, worker_id, %err, "window trigger failed");
                    metrics.record_pipeline_error();
                }
            }
        }
        Task::Stop => unreachable!("Stop is handled by the worker loop before dispatch"),
    }
}

/// Spawns and owns the worker threads. Dropping the pool does not stop the
/// workers; call `stop_and_join` explicitly so in-flight tasks get a chance
/// to drain.
pub struct WorkerPool {
    handles: Vec<std::thread::JoinHandle<()>>,
    stop: StopToken,
}

impl WorkerPool {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn<F>(
        worker_count: WorkerCount,
        queue: Arc<TaskQueue>,
        registry: Arc<PipelineRegistry>,
        window_handlers: Arc<WindowHandlerRegistry>,
        stop: StopToken,
        metrics: Arc<EngineMetrics>,
        make_context: F,
    ) -> Self
    where
        F: Fn(usize) -> Box<dyn ProcessingContext> + Send + Sync + 'static,
    {
        let make_context = Arc::new(make_context);
        let mut handles = Vec::with_capacity(worker_count.get() as usize);
        for worker_id in 0..worker_count.get() as usize {
            let queue = Arc::clone(&queue);
            let registry = Arc::clone(&registry);
            let window_handlers = Arc::clone(&window_handlers);
            let stop = stop.clone();
            let make_context = Arc::clone(&make_context);
            let metrics = Arc::clone(&metrics);
            let handle = std::thread::Builder::new()
                .name(format!("nes-worker-{worker_id}"))
                .spawn(move || {
                    info!(worker_id, "worker started");
                    let ctx = make_context(worker_id);
                    loop {
                        match queue.next(&stop) {
                            None => break,
                            Some(Task::Stop) => break,
                            Some(task) => dispatch(task, &registry, &window_handlers, &queue, ctx.as_ref(), worker_id, &metrics),
                        }
                    }
                    info!(worker_id, "worker exited");
                })
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }
        Self { handles, stop }
    }

    /// Requests cooperative shutdown and blocks until every worker has
    /// drained its in-flight task and exited.
    pub fn stop_and_join(self) {
        self.stop.stop();
        for handle in self.handles {
            let _ = handle.join();
        }
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }
}
