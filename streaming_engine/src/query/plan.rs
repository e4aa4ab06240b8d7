// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The query plan descriptor `register_query` accepts: pipelines
//! with their operator chains and schemas, the edges joining them, and which
//! pipeline ids are sources and sinks. Deliberately plain data — lowering a
//! plan into running [`PipelineStageRuntime`]s is
//! [`crate::query::engine::QueryEngine::register_query`]'s job, not this
//! struct's.

use crate::query::row::Schema;
use serde::{Deserialize, Serialize};
use streaming_domain::entities::PipelineStage;
use streaming_domain::value_objects::{PipelineId, WindowDefinition};

/// One compiled unit in the plan: its schema and its operator chain. A
/// `role` of `Source`/`Sink` additionally requires an adapter be supplied
/// to `register_query` under the matching `PipelineId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub id: PipelineId,
    pub schema: Schema,
    pub stages: Vec<PipelineStage>,
    /// Where this pipeline's output goes once processed. Empty for a sink.
    pub successors: Vec<PipelineId>,
    /// Set only for window-build / join-build pipelines: the window this
    /// pipeline's stateful operator groups records into, and which
    /// pipeline id to target with `Task::TriggerWindow` once it closes
    /// — typically itself for aggregation, the probe
    /// pipeline for a join.
    pub window: Option<WindowTrigger>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowTrigger {
    pub definition: WindowDefinition,
    pub trigger_target: PipelineId,
    pub expected_origins: usize,
}

/// A full query: every pipeline plus which ones are sources (need a
/// `Source` adapter) and sinks (need a `Sink` adapter).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueryPlan {
    pub pipelines: Vec<PipelineSpec>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipeline(mut self, pipeline: PipelineSpec) -> Self {
        self.pipelines.push(pipeline);
        self
    }
}
