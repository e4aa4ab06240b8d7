// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The window operator handler: the glue between a
//! buffer closing on an origin and a `Task::TriggerWindow` reaching the task
//! queue. Tracks the watermark per query, and on every advance, enumerates
//! every window whose end now falls at or before the new watermark and
//! enqueues one trigger task per window.

use crate::infrastructure::runtime::task_queue::TaskQueue;
use crate::infrastructure::runtime::watermark_processor::WatermarkProcessor;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use streaming_domain::entities::Task;
use streaming_domain::value_objects::{OriginId, PipelineId, SequenceNumber, SliceAssigner, Timestamp, Watermark};

/// Binds one compiled window pipeline to the assigner that derives its
/// slices and the watermark processor tracking its input origins.
pub struct WindowOperatorHandler {
    pipeline_id: PipelineId,
    assigner: SliceAssigner,
    watermark: WatermarkProcessor,
    last_triggered_end: Mutex<Timestamp>,
}

impl WindowOperatorHandler {
    pub fn new(pipeline_id: PipelineId, assigner: SliceAssigner, expected_origins: usize) -> Self {
        Self {
            pipeline_id,
            assigner,
            watermark: WatermarkProcessor::new(expected_origins),
            last_triggered_end: Mutex::new(0),
        }
    }

    /// Called once a buffer carrying `(origin, seq, watermark_ts)` has been
    /// fully processed. If the global watermark advances past
    /// one or more window ends not yet triggered, enqueues a
    /// `Task::TriggerWindow` per window onto `queue`, oldest first.
    pub fn on_buffer_closed(
        &self,
        origin: OriginId,
        seq: SequenceNumber,
        watermark_ts: Timestamp,
        queue: &Arc<TaskQueue>,
    ) -> Watermark {
        let new_watermark = self.watermark.update(origin, seq, watermark_ts);
        let mut last_end = self.last_triggered_end.lock();
        let windows = self.assigner.windows_ending_in(*last_end, new_watermark.ts());
        for window in &windows {
            queue.submit_internal(Task::trigger_window(self.pipeline_id, *window, Vec::new()));
        }
        if let Some(latest) = windows.last() {
            *last_end = latest.end;
        }
        new_watermark
    }

    pub fn current_watermark(&self) -> Watermark {
        self.watermark.current_watermark()
    }

    /// Forces every still-open window covering event-time up to and
    /// including `max_ts` to trigger, without waiting for the watermark to
    /// cross its end. Called once a query's sources have all reached
    /// end-of-stream: a finite stream's final partial window (e.g. a
    /// tumbling `[5,10)` slice whose last record is at `ts=9`) would
    /// otherwise never see a watermark advance past its own end and so
    /// would never trigger through `on_buffer_closed` alone.
    pub fn flush_through(&self, max_ts: Timestamp, queue: &Arc<TaskQueue>) {
        let end = self.assigner.slice_end(max_ts);
        let mut last_end = self.last_triggered_end.lock();
        let windows = self.assigner.windows_ending_in(*last_end, end);
        for window in &windows {
            queue.submit_internal(Task::trigger_window(self.pipeline_id, *window, Vec::new()));
        }
        if let Some(latest) = windows.last() {
            *last_end = latest.end;
        }
    }

    pub fn pipeline_id(&self) -> PipelineId {
        self.pipeline_id
    }
}

/// Maps the stateful pipeline whose buffers drive a watermark (a window
/// build, or one side of a join build) to the handler that watches it. The
/// worker pool consults this after every successful `execute` on a stateful
/// pipeline to decide whether to call `on_buffer_closed`.
#[derive(Default)]
pub struct WindowHandlerRegistry {
    handlers: RwLock<HashMap<PipelineId, Arc<WindowOperatorHandler>>>,
}

impl WindowHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` to be notified when buffers close on
    /// `source_pipeline` (the build pipeline feeding it); `source_pipeline`
    /// need not equal `handler.pipeline_id()`, since a join's probe trigger
    /// target differs from the build pipeline whose buffers close it.
    pub fn register(&self, source_pipeline: PipelineId, handler: Arc<WindowOperatorHandler>) {
        self.handlers.write().insert(source_pipeline, handler);
    }

    pub fn get(&self, source_pipeline: PipelineId) -> Option<Arc<WindowOperatorHandler>> {
        self.handlers.read().get(&source_pipeline).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }
}
