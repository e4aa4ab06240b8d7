// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Pipelines and the query-owned graph linking them.
//!
//! Predecessor/successor pipelines would naturally form a cyclic ownership
//! graph (each holds the other). Per this design note on cyclic
//! owner graphs, that is collapsed here: `PipelineGraph` owns every pipeline
//! by value behind an interior `id -> pipeline` map, and each `Pipeline`
//! stores only its neighbors' ids. This also makes stop-ordering explicit —
//! the graph, not the pipelines, decides traversal order.

use crate::entities::pipeline_stage::PipelineStage;
use crate::value_objects::PipelineId;
use std::collections::HashMap;

/// The position a pipeline occupies in a query's dataflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineRole {
    Source,
    Sink,
    Operator,
}

/// A compiled unit of execution. Set up exactly once per query, executed
/// many times concurrently by different workers on different buffers,
/// stopped exactly once.
pub struct Pipeline {
    id: PipelineId,
    role: PipelineRole,
    predecessors: Vec<PipelineId>,
    successors: Vec<PipelineId>,
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    pub fn new(id: PipelineId, role: PipelineRole, stages: Vec<PipelineStage>) -> Self {
        Self {
            id,
            role,
            predecessors: Vec::new(),
            successors: Vec::new(),
            stages,
        }
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn role(&self) -> PipelineRole {
        self.role
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn predecessors(&self) -> &[PipelineId] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[PipelineId] {
        &self.successors
    }
}

/// Owns every pipeline in a query plan by value, behind an `id -> pipeline`
/// map, breaking the predecessor/successor reference cycle.
#[derive(Default)]
pub struct PipelineGraph {
    pipelines: HashMap<PipelineId, Pipeline>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pipeline: Pipeline) {
        self.pipelines.insert(pipeline.id(), pipeline);
    }

    /// Records a directed edge `from -> to` (`from` is a predecessor of
    /// `to`). Both ends must already be present in the graph.
    pub fn link(&mut self, from: PipelineId, to: PipelineId) {
        if let Some(p) = self.pipelines.get_mut(&from) {
            p.successors.push(to);
        }
        if let Some(p) = self.pipelines.get_mut(&to) {
            p.predecessors.push(from);
        }
    }

    pub fn get(&self, id: PipelineId) -> Option<&Pipeline> {
        self.pipelines.get(&id)
    }

    pub fn sources(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.values().filter(|p| p.role() == PipelineRole::Source)
    }

    pub fn sinks(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.values().filter(|p| p.role() == PipelineRole::Sink)
    }

    /// A stop order such that every pipeline appears after all of its
    /// predecessors: sources drain first, sinks stop last.
    pub fn topological_stop_order(&self) -> Vec<PipelineId> {
        let mut visited = std::collections::HashSet::new();
        let mut order = Vec::with_capacity(self.pipelines.len());

        fn visit(
            id: PipelineId,
            pipelines: &HashMap<PipelineId, Pipeline>,
            visited: &mut std::collections::HashSet<PipelineId>,
            order: &mut Vec<PipelineId>,
        ) {
            if !visited.insert(id) {
                return;
            }
            if let Some(pipeline) = pipelines.get(&id) {
                for pred in &pipeline.predecessors {
                    visit(*pred, pipelines, visited, order);
                }
            }
            order.push(id);
        }

        let mut ids: Vec<_> = self.pipelines.keys().copied().collect();
        ids.sort();
        for id in ids {
            visit(id, &self.pipelines, &mut visited, &mut order);
        }
        order
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}
