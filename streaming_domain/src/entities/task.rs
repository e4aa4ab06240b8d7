// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The unit of work dispatched through the task queue.

use crate::entities::tuple_buffer::TupleBuffer;
use crate::value_objects::{PipelineId, SliceBounds};

/// A unit of work. Immutable once enqueued: a worker either executes it and
/// produces follow-up tasks, or (for `Stop`) shuts down.
pub enum Task {
    ExecutePipeline {
        pipeline_id: PipelineId,
        buffer: TupleBuffer,
    },
    TriggerWindow {
        pipeline_id: PipelineId,
        window: SliceBounds,
        slice_ids: Vec<u64>,
    },
    Stop,
}

impl Task {
    pub fn execute_pipeline(pipeline_id: PipelineId, buffer: TupleBuffer) -> Self {
        Self::ExecutePipeline { pipeline_id, buffer }
    }

    pub fn trigger_window(pipeline_id: PipelineId, window: SliceBounds, slice_ids: Vec<u64>) -> Self {
        Self::TriggerWindow {
            pipeline_id,
            window,
            slice_ids,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Task::Stop)
    }

    pub fn pipeline_id(&self) -> Option<PipelineId> {
        match self {
            Task::ExecutePipeline { pipeline_id, .. } => Some(*pipeline_id),
            Task::TriggerWindow { pipeline_id, .. } => Some(*pipeline_id),
            Task::Stop => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_carries_no_pipeline() {
        assert_eq!(Task::Stop.pipeline_id(), None);
        assert!(Task::Stop.is_stop());
    }
}
