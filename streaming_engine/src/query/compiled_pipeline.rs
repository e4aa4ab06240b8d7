// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Concrete [`PipelineStageRuntime`] implementations the query engine lowers
//! a [`crate::query::plan::PipelineSpec`] into ("compiled" runtimes). Each
//! one here is the one concrete instantiation this crate ships for its
//! operator kind, in place of an actual query compiler emitting per-query
//! machine code.

use crate::infrastructure::runtime::aggregation_engine::AggregationEngine;
use crate::infrastructure::runtime::join_engine::{HashJoinEngine, JoinType, NestedLoopJoinEngine};
use crate::infrastructure::runtime::sink_sequencer::SinkSequencer;
use crate::query::row::{self, Row, Schema};
use std::sync::Arc;
use streaming_domain::entities::{Arity, Comparison, ExecutionResult, OperatorKind, PipelineStage, ProcessingContext, TupleBuffer};
use streaming_domain::error::EngineError;
use streaming_domain::repositories::{PipelineStageRuntime, Sink};
use streaming_domain::services::SumState;
use streaming_domain::value_objects::{PipelineId, SliceAssigner, SliceBounds};

fn field_index_or_err(schema: &Schema, name: &str) -> Result<usize, EngineError> {
    row::field_index(schema, name).ok_or_else(|| EngineError::SchemaMismatch {
        origin: 0,
        reason: format!("field '{name}' not present in schema {schema:?}"),
    })
}

/// A resolved, schema-bound form of [`OperatorKind::Filter`]/[`OperatorKind::Map`];
/// field names are turned into byte offsets once, at plan-compile time, never
/// on the hot path.
enum ChainOp {
    Filter { field_idx: usize, comparison: Comparison, threshold: f64 },
    Map { input_idx: usize, output_idx: usize, scale: f64, offset: f64 },
}

/// Resolves every `Filter`/`Map` stage in `stages` against `schema`; `Scan`
/// and `Emit` are pass-through markers and contribute no op. Fails fast if a
/// stage names a field the pipeline's own schema doesn't carry.
fn compile_chain_ops(schema: &Schema, stages: &[PipelineStage]) -> Result<Vec<ChainOp>, EngineError> {
    let mut ops = Vec::new();
    for stage in stages {
        match &stage.kind {
            OperatorKind::Scan { .. } | OperatorKind::Emit => {}
            OperatorKind::Filter { predicate_field, comparison, threshold } => {
                ops.push(ChainOp::Filter {
                    field_idx: field_index_or_err(schema, predicate_field)?,
                    comparison: *comparison,
                    threshold: *threshold,
                });
            }
            OperatorKind::Map { input_field, output_field, scale, offset } => {
                ops.push(ChainOp::Map {
                    input_idx: field_index_or_err(schema, input_field)?,
                    output_idx: field_index_or_err(schema, output_field)?,
                    scale: *scale,
                    offset: *offset,
                });
            }
            other => {
                return Err(EngineError::invariant(format!(
                    "operator {other:?} cannot appear in a plain chain; it needs its own runtime"
                )));
            }
        }
    }
    Ok(ops)
}

fn apply_chain_ops(ops: &[ChainOp], rows: Vec<Row>) -> Vec<Row> {
    let mut out = Vec::with_capacity(rows.len());
    'rows: for mut record in rows {
        for op in ops {
            match op {
                ChainOp::Filter { field_idx, comparison, threshold } => {
                    if !comparison.evaluate(record[*field_idx], *threshold) {
                        continue 'rows;
                    }
                }
                ChainOp::Map { input_idx, output_idx, scale, offset } => {
                    record[*output_idx] = record[*input_idx] * scale + offset;
                }
            }
        }
        out.push(record);
    }
    out
}

/// Runs a unary `Scan -> Filter* -> Map* -> Emit` chain: decode rows once,
/// fold every op over them in order, re-encode a fresh buffer per successor.
/// `TupleBuffer` has no `Clone`, so fanning out to N successors costs N
/// allocations from the pool, one buffer each.
pub struct ChainRuntime {
    schema_len: usize,
    ops: Vec<ChainOp>,
    successors: Vec<PipelineId>,
}

impl ChainRuntime {
    pub fn new(schema: &Schema, stages: &[PipelineStage], successors: Vec<PipelineId>) -> Result<Self, EngineError> {
        Ok(Self {
            schema_len: schema.len(),
            ops: compile_chain_ops(schema, stages)?,
            successors,
        })
    }
}

impl PipelineStageRuntime for ChainRuntime {
    fn setup(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn execute(&self, input: TupleBuffer, ctx: &dyn ProcessingContext, _worker_id: usize) -> Result<ExecutionResult, EngineError> {
        let metadata = *input.metadata();
        let rows = apply_chain_ops(&self.ops, row::read_rows(&input, self.schema_len));
        drop(input);
        if rows.is_empty() {
            return Ok(ExecutionResult::Dropped);
        }
        let mut produced = 0;
        for &successor in &self.successors {
            let mut out = ctx.allocate_buffer()?;
            out.set_metadata(metadata);
            row::write_rows(&mut out, &rows, self.schema_len)?;
            ctx.emit_buffer(successor, out)?;
            produced += rows.len();
        }
        Ok(ExecutionResult::Produced(produced))
    }

    fn stop(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Terminal stage for a `Sink`-role pipeline: reorders arrivals through a
/// per-origin [`SinkSequencer`] before handing buffers to the adapter, so
/// out-of-order completion upstream (concurrent workers racing on distinct
/// sequences of the same origin) still surfaces in increasing
/// sequence-number order — no decode/re-encode round trip otherwise.
pub struct SinkRuntime {
    sink: Arc<dyn Sink>,
    sequencer: SinkSequencer,
}

impl SinkRuntime {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self { sink, sequencer: SinkSequencer::new() }
    }
}

impl PipelineStageRuntime for SinkRuntime {
    fn setup(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn execute(&self, input: TupleBuffer, _ctx: &dyn ProcessingContext, _worker_id: usize) -> Result<ExecutionResult, EngineError> {
        let ready = self.sequencer.admit(input);
        let produced = ready.len();
        for buffer in ready {
            self.sink.on_buffer(buffer)?;
        }
        Ok(ExecutionResult::Produced(produced))
    }

    fn stop(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Drives a `WindowBuild` operator: inserts every record into the slice its
/// event-time falls into, and on `trigger_window` retires that slice and
/// emits one result row per group (or a single row for an unkeyed window).
///
/// `SumState` is the one concrete `AggregationFunction` wired up here;
/// swapping in another `Aggregate` kind only requires a new `F` type
/// parameter, the surrounding machinery is generic over it already.
pub struct WindowRuntime {
    schema_len: usize,
    time_idx: usize,
    aggregate_idx: usize,
    group_idx: Option<usize>,
    assigner: SliceAssigner,
    engine: Arc<AggregationEngine<u64, SumState>>,
    successors: Vec<PipelineId>,
}

impl WindowRuntime {
    pub fn new(
        schema: &Schema,
        time_field: &str,
        aggregate_field: &str,
        group_by_field: Option<&str>,
        assigner: SliceAssigner,
        engine: Arc<AggregationEngine<u64, SumState>>,
        successors: Vec<PipelineId>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            schema_len: schema.len(),
            time_idx: field_index_or_err(schema, time_field)?,
            aggregate_idx: field_index_or_err(schema, aggregate_field)?,
            group_idx: group_by_field.map(|f| field_index_or_err(schema, f)).transpose()?,
            assigner,
            engine,
            successors,
        })
    }

    /// Output schema a consumer of this window's results should expect:
    /// `[group_key?, sum, window_start, window_end]`.
    pub fn output_row_len(&self) -> usize {
        if self.group_idx.is_some() {
            4
        } else {
            3
        }
    }
}

impl PipelineStageRuntime for WindowRuntime {
    fn setup(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn execute(&self, input: TupleBuffer, _ctx: &dyn ProcessingContext, worker_id: usize) -> Result<ExecutionResult, EngineError> {
        let rows = row::read_rows(&input, self.schema_len);
        drop(input);
        for record in &rows {
            let bounds = self.assigner.slice_for(record[self.time_idx] as u64);
            match self.group_idx {
                Some(idx) => self.engine.insert_keyed(bounds, worker_id, record[idx] as u64, record[self.aggregate_idx]),
                None => self.engine.insert_unkeyed(bounds, record[self.aggregate_idx]),
            }
        }
        Ok(ExecutionResult::Dropped)
    }

    fn stop(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn trigger_window(&self, window: SliceBounds, ctx: &dyn ProcessingContext) -> Result<ExecutionResult, EngineError> {
        let output_rows: Vec<Row> = match self.group_idx {
            Some(_) => self
                .engine
                .trigger_keyed(window)
                .into_iter()
                .map(|(key, sum)| vec![key as f64, sum, window.start as f64, window.end as f64])
                .collect(),
            None => self
                .engine
                .trigger_unkeyed(window)
                .map(|sum| vec![sum, window.start as f64, window.end as f64])
                .into_iter()
                .collect(),
        };
        if output_rows.is_empty() {
            return Ok(ExecutionResult::Dropped);
        }
        let row_len = self.output_row_len();
        let mut produced = 0;
        for &successor in &self.successors {
            let mut out = ctx.allocate_buffer()?;
            row::write_rows(&mut out, &output_rows, row_len)?;
            ctx.emit_buffer(successor, out)?;
            produced += output_rows.len();
        }
        Ok(ExecutionResult::Produced(produced))
    }
}

/// One side (`arity`) of a hash join's build phase: inserts every record
/// into the slice store keyed by the join key, for later probing.
pub struct HashJoinBuildRuntime {
    schema_len: usize,
    time_idx: usize,
    key_idx: usize,
    assigner: SliceAssigner,
    engine: Arc<HashJoinEngine<u64, Row>>,
    left: bool,
}

impl HashJoinBuildRuntime {
    pub fn new(
        schema: &Schema,
        time_field: &str,
        key_field: &str,
        arity: Arity,
        assigner: SliceAssigner,
        engine: Arc<HashJoinEngine<u64, Row>>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            schema_len: schema.len(),
            time_idx: field_index_or_err(schema, time_field)?,
            key_idx: field_index_or_err(schema, key_field)?,
            assigner,
            engine,
            left: matches!(arity, Arity::BinaryLeft),
        })
    }
}

impl PipelineStageRuntime for HashJoinBuildRuntime {
    fn setup(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn execute(&self, input: TupleBuffer, _ctx: &dyn ProcessingContext, worker_id: usize) -> Result<ExecutionResult, EngineError> {
        let rows = row::read_rows(&input, self.schema_len);
        drop(input);
        for record in rows {
            let bounds = self.assigner.slice_for(record[self.time_idx] as u64);
            let key = record[self.key_idx] as u64;
            if self.left {
                self.engine.insert_left(bounds, worker_id, key, record);
            } else {
                self.engine.insert_right(bounds, worker_id, key, record);
            }
        }
        Ok(ExecutionResult::Dropped)
    }

    fn stop(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }
}

/// The probe side of a hash join: only ever reached via `trigger_window`,
/// never `execute` (it has no buffer input path of its own — both builds
/// feed the shared engine directly). Emits one merged row per matched pair:
/// every left field, followed by every right field, zero-filled on the
/// unmatched side of an outer join.
pub struct HashJoinProbeRuntime {
    left_schema_len: usize,
    right_schema_len: usize,
    join_type: JoinType,
    engine: Arc<HashJoinEngine<u64, Row>>,
    successors: Vec<PipelineId>,
}

impl HashJoinProbeRuntime {
    pub fn new(
        left_schema_len: usize,
        right_schema_len: usize,
        join_type: JoinType,
        engine: Arc<HashJoinEngine<u64, Row>>,
        successors: Vec<PipelineId>,
    ) -> Self {
        Self {
            left_schema_len,
            right_schema_len,
            join_type,
            engine,
            successors,
        }
    }
}

impl PipelineStageRuntime for HashJoinProbeRuntime {
    fn setup(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn execute(&self, _input: TupleBuffer, _ctx: &dyn ProcessingContext, _worker_id: usize) -> Result<ExecutionResult, EngineError> {
        Ok(ExecutionResult::Dropped)
    }

    fn stop(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn trigger_window(&self, window: SliceBounds, ctx: &dyn ProcessingContext) -> Result<ExecutionResult, EngineError> {
        let pairs = self.engine.probe(window, self.join_type);
        if pairs.is_empty() {
            return Ok(ExecutionResult::Dropped);
        }
        let row_len = self.left_schema_len + self.right_schema_len;
        let merged: Vec<Row> = pairs
            .into_iter()
            .map(|pair| {
                let mut row = pair.left.unwrap_or_else(|| vec![0.0; self.left_schema_len]);
                row.extend(pair.right.unwrap_or_else(|| vec![0.0; self.right_schema_len]));
                row
            })
            .collect();
        let mut produced = 0;
        for &successor in &self.successors {
            let mut out = ctx.allocate_buffer()?;
            row::write_rows(&mut out, &merged, row_len)?;
            ctx.emit_buffer(successor, out)?;
            produced += merged.len();
        }
        Ok(ExecutionResult::Produced(produced))
    }
}

/// The nested-loop counterpart of [`HashJoinBuildRuntime`]/[`HashJoinProbeRuntime`],
/// for joins with no equality key to hash on.
pub struct NljBuildRuntime {
    schema_len: usize,
    time_idx: usize,
    assigner: SliceAssigner,
    engine: Arc<NestedLoopJoinEngine<Row>>,
    left: bool,
}

impl NljBuildRuntime {
    pub fn new(
        schema: &Schema,
        time_field: &str,
        arity: Arity,
        assigner: SliceAssigner,
        engine: Arc<NestedLoopJoinEngine<Row>>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            schema_len: schema.len(),
            time_idx: field_index_or_err(schema, time_field)?,
            assigner,
            engine,
            left: matches!(arity, Arity::BinaryLeft),
        })
    }
}

impl PipelineStageRuntime for NljBuildRuntime {
    fn setup(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn execute(&self, input: TupleBuffer, _ctx: &dyn ProcessingContext, worker_id: usize) -> Result<ExecutionResult, EngineError> {
        let rows = row::read_rows(&input, self.schema_len);
        drop(input);
        for record in rows {
            let bounds = self.assigner.slice_for(record[self.time_idx] as u64);
            if self.left {
                self.engine.insert_left(bounds, worker_id, record);
            } else {
                self.engine.insert_right(bounds, worker_id, record);
            }
        }
        Ok(ExecutionResult::Dropped)
    }

    fn stop(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }
}

pub struct NljProbeRuntime {
    left_schema_len: usize,
    right_schema_len: usize,
    join_type: JoinType,
    engine: Arc<NestedLoopJoinEngine<Row>>,
    successors: Vec<PipelineId>,
}

impl NljProbeRuntime {
    pub fn new(
        left_schema_len: usize,
        right_schema_len: usize,
        join_type: JoinType,
        engine: Arc<NestedLoopJoinEngine<Row>>,
        successors: Vec<PipelineId>,
    ) -> Self {
        Self {
            left_schema_len,
            right_schema_len,
            join_type,
            engine,
            successors,
        }
    }
}

impl PipelineStageRuntime for NljProbeRuntime {
    fn setup(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn execute(&self, _input: TupleBuffer, _ctx: &dyn ProcessingContext, _worker_id: usize) -> Result<ExecutionResult, EngineError> {
        Ok(ExecutionResult::Dropped)
    }

    fn stop(&self, _ctx: &dyn ProcessingContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn trigger_window(&self, window: SliceBounds, ctx: &dyn ProcessingContext) -> Result<ExecutionResult, EngineError> {
        let pairs = self.engine.probe(window, self.join_type);
        if pairs.is_empty() {
            return Ok(ExecutionResult::Dropped);
        }
        let row_len = self.left_schema_len + self.right_schema_len;
        let merged: Vec<Row> = pairs
            .into_iter()
            .map(|pair| {
                let mut row = pair.left.unwrap_or_else(|| vec![0.0; self.left_schema_len]);
                row.extend(pair.right.unwrap_or_else(|| vec![0.0; self.right_schema_len]));
                row
            })
            .collect();
        let mut produced = 0;
        for &successor in &self.successors {
            let mut out = ctx.allocate_buffer()?;
            row::write_rows(&mut out, &merged, row_len)?;
            ctx.emit_buffer(successor, out)?;
            produced += merged.len();
        }
        Ok(ExecutionResult::Produced(produced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::runtime::buffer_pool::BufferPool;
    use crate::infrastructure::runtime::processing_context::EngineProcessingContext;
    use crate::infrastructure::runtime::stop_token::StopToken;
    use crate::infrastructure::runtime::task_queue::TaskQueue;
    use streaming_domain::entities::Task;
    use streaming_domain::services::SumState;
    use streaming_domain::value_objects::{BufferMetadata, OriginId, SequenceNumber};

    fn ctx() -> (EngineProcessingContext, Arc<TaskQueue>) {
        let pool = BufferPool::new(8, 256);
        let queue = Arc::new(TaskQueue::new(16));
        let stop = StopToken::new();
        (EngineProcessingContext::new(0, pool, Arc::clone(&queue), stop), queue)
    }

    fn input_buffer(rows: &[Row], schema_len: usize) -> TupleBuffer {
        let pool = BufferPool::new(1, 256);
        let stop = StopToken::new();
        let metadata = BufferMetadata::new(OriginId::new(1), SequenceNumber::INITIAL, 0);
        let mut buf = pool.acquire(metadata, &stop).unwrap();
        row::write_rows(&mut buf, rows, schema_len).unwrap();
        buf
    }

    #[test]
    fn filter_drops_rows_not_matching_the_predicate() {
        let schema: Schema = vec!["id".into(), "val".into()];
        let stages = vec![PipelineStage::new(
            0,
            OperatorKind::Filter {
                predicate_field: "val".into(),
                comparison: Comparison::GreaterThan,
                threshold: 15.0,
            },
        )];
        let runtime = ChainRuntime::new(&schema, &stages, vec![PipelineId::new(2)]).unwrap();
        let (ctx, queue) = ctx();
        let input = input_buffer(&[vec![1.0, 10.0], vec![2.0, 20.0]], 2);
        let result = runtime.execute(input, &ctx, 0).unwrap();
        assert_eq!(result, ExecutionResult::Produced(1));
        let task = queue.try_next().expect("one buffer forwarded");
        match task {
            Task::ExecutePipeline { buffer, .. } => {
                assert_eq!(row::read_rows(&buffer, 2), vec![vec![2.0, 20.0]]);
            }
            _ => panic!("expected ExecutePipeline"),
        }
    }

    #[test]
    fn map_scales_the_input_field_into_the_output_field() {
        let schema: Schema = vec!["id".into(), "val".into()];
        let stages = vec![PipelineStage::new(
            0,
            OperatorKind::Map {
                input_field: "val".into(),
                output_field: "val".into(),
                scale: 2.0,
                offset: 0.0,
            },
        )];
        let runtime = ChainRuntime::new(&schema, &stages, vec![PipelineId::new(2)]).unwrap();
        let (ctx, queue) = ctx();
        let input = input_buffer(&[vec![1.0, 10.0]], 2);
        runtime.execute(input, &ctx, 0).unwrap();
        let task = queue.try_next().unwrap();
        match task {
            Task::ExecutePipeline { buffer, .. } => assert_eq!(row::read_rows(&buffer, 2), vec![vec![1.0, 20.0]]),
            _ => panic!("expected ExecutePipeline"),
        }
    }

    #[test]
    fn window_runtime_sums_per_key_and_emits_on_trigger() {
        let schema: Schema = vec!["key".into(), "val".into(), "ts".into()];
        let engine = Arc::new(AggregationEngine::<u64, SumState>::new(SumState, 1));
        let runtime = WindowRuntime::new(
            &schema,
            "ts",
            "val",
            Some("key"),
            SliceAssigner::new(10, 10),
            Arc::clone(&engine),
            vec![PipelineId::new(9)],
        )
        .unwrap();
        let (ctx, queue) = ctx();
        let input = input_buffer(&[vec![1.0, 10.0, 1.0], vec![1.0, 5.0, 2.0]], 3);
        let result = runtime.execute(input, &ctx, 0).unwrap();
        assert_eq!(result, ExecutionResult::Dropped);
        let fired = runtime.trigger_window(SliceBounds::new(0, 10), &ctx).unwrap();
        assert_eq!(fired, ExecutionResult::Produced(1));
        let task = queue.try_next().unwrap();
        match task {
            Task::ExecutePipeline { buffer, .. } => {
                let rows = row::read_rows(&buffer, 4);
                assert_eq!(rows, vec![vec![1.0, 15.0, 0.0, 10.0]]);
            }
            _ => panic!("expected ExecutePipeline"),
        }
    }
}
