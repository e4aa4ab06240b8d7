// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The pipeline stage runtime registry: maps a
//! [`PipelineId`] to its compiled [`PipelineStageRuntime`] so the worker pool
//! can dispatch without knowing how any particular stage was compiled.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use streaming_domain::repositories::PipelineStageRuntime;
use streaming_domain::value_objects::PipelineId;

#[derive(Default)]
pub struct PipelineRegistry {
    runtimes: RwLock<HashMap<PipelineId, Arc<dyn PipelineStageRuntime>>>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pipeline_id: PipelineId, runtime: Arc<dyn PipelineStageRuntime>) {
        self.runtimes.write().insert(pipeline_id, runtime);
    }

    pub fn get(&self, pipeline_id: PipelineId) -> Option<Arc<dyn PipelineStageRuntime>> {
        self.runtimes.read().get(&pipeline_id).cloned()
    }

    pub fn deregister(&self, pipeline_id: PipelineId) {
        self.runtimes.write().remove(&pipeline_id);
    }

    pub fn len(&self) -> usize {
        self.runtimes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streaming_domain::entities::{ExecutionResult, ProcessingContext, TupleBuffer};
    use streaming_domain::error::EngineError;

    struct NoopRuntime;

    impl PipelineStageRuntime for NoopRuntime {
        fn setup(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
            Ok(())
        }
        fn execute(
            &self,
            _input: TupleBuffer,
            _ctx: &dyn ProcessingContext,
            _worker_id: usize,
        ) -> Result<ExecutionResult, EngineError> {
            Ok(ExecutionResult::Dropped)
        }
        fn stop(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
            Ok(())
        }
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let registry = PipelineRegistry::new();
        let id = PipelineId::new(1);
        registry.register(id, Arc::new(NoopRuntime));
        assert!(registry.get(id).is_some());
        assert_eq!(registry.len(), 1);
        registry.deregister(id);
        assert!(registry.get(id).is_none());
    }
}
