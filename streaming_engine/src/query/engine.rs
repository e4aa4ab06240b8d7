// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The query engine: lowers a [`QueryPlan`] into compiled
//! [`PipelineStageRuntime`]s registered against the shared worker pool, and
//! drives each registered query's source adapters on their own threads.
//!
//! By convention, the last field in every pipeline's schema is the
//! event-time column a source stamps the ingestion watermark from; every
//! other timestamp a stage needs (window/join build time fields) is named
//! explicitly in its `OperatorKind` instead (see DESIGN.md). Every probe
//! runtime this engine compiles uses `JoinType::Inner`; the plan format has
//! no slot yet for an outer-join request (see DESIGN.md's Open Questions).

use crate::infrastructure::metrics::EngineMetrics;
use crate::infrastructure::runtime::aggregation_engine::AggregationEngine;
use crate::infrastructure::runtime::buffer_pool::BufferPool;
use crate::infrastructure::runtime::join_engine::{HashJoinEngine, JoinType, NestedLoopJoinEngine};
use crate::infrastructure::runtime::pipeline_runtime::PipelineRegistry;
use crate::infrastructure::runtime::processing_context::EngineProcessingContext;
use crate::infrastructure::runtime::stop_token::StopToken;
use crate::infrastructure::runtime::task_queue::TaskQueue;
use crate::infrastructure::runtime::window_operator_handler::{WindowHandlerRegistry, WindowOperatorHandler};
use crate::infrastructure::runtime::worker_pool::WorkerPool;
use crate::query::compiled_pipeline::{
    ChainRuntime, HashJoinBuildRuntime, HashJoinProbeRuntime, NljBuildRuntime, NljProbeRuntime, SinkRuntime, WindowRuntime,
};
use crate::query::plan::{PipelineSpec, QueryPlan};
use crate::query::row;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use streaming_bootstrap::config::EngineConfig;
use streaming_domain::entities::{Arity, OperatorKind, Pipeline, PipelineGraph, PipelineRole, Task};
use streaming_domain::error::EngineError;
use streaming_domain::repositories::{FillResult, PipelineStageRuntime, Sink, Source, StopSignal};
use streaming_domain::services::SumState;
use streaming_domain::value_objects::{BufferMetadata, OriginId, PipelineId, QueryId, SequenceNumber, WorkerCount};
use tracing::{error, info, warn};

/// Everything the engine needs to drive one registered query's source
/// adapters and tear it down again.
struct RunningQuery {
    pipeline_ids: Vec<PipelineId>,
    sources: HashMap<PipelineId, Arc<dyn Source>>,
    schema_lens: HashMap<PipelineId, usize>,
    stop_order: Vec<PipelineId>,
    query_stop: StopToken,
    source_threads: Vec<std::thread::JoinHandle<()>>,
    started: bool,
    /// Highest `watermark_ts` any source stamped onto a buffer for this
    /// query, kept so `stop_query` can flush each window handler's final
    /// partial window once every source has reached end-of-stream.
    max_watermark_ts: Arc<AtomicU64>,
}

/// Owns the shared runtime (buffer pool, task queue, worker pool) and the
/// set of currently registered queries.
pub struct QueryEngine {
    pool: Arc<BufferPool>,
    queue: Arc<TaskQueue>,
    registry: Arc<PipelineRegistry>,
    window_handlers: Arc<WindowHandlerRegistry>,
    engine_stop: StopToken,
    workers: Mutex<Option<WorkerPool>>,
    queries: Mutex<HashMap<QueryId, RunningQuery>>,
    next_query_id: AtomicU64,
    metrics: Arc<EngineMetrics>,
    query_stop_timeout_ms: u64,
}

impl QueryEngine {
    /// Boots the shared runtime: allocates the buffer pool and spawns
    /// `config.number_of_worker_threads()` workers against a fresh task
    /// queue. No query is registered yet.
    pub fn start(config: &EngineConfig) -> Result<Self, EngineError> {
        let worker_count = WorkerCount::new(config.number_of_worker_threads() as u32)?;
        let pool = BufferPool::new(config.admission_queue_size() as usize, config.operator_buffer_size() as usize);
        let queue = Arc::new(TaskQueue::new(config.admission_queue_size() as usize));
        let registry = Arc::new(PipelineRegistry::new());
        let window_handlers = Arc::new(WindowHandlerRegistry::new());
        let engine_stop = StopToken::new();
        let metrics = Arc::new(EngineMetrics::new()?);

        let worker_pool = {
            let worker_pool_context_stop = engine_stop.clone();
            let pool_for_workers = Arc::clone(&pool);
            let queue_for_workers = Arc::clone(&queue);
            WorkerPool::spawn(
                worker_count,
                Arc::clone(&queue),
                Arc::clone(&registry),
                Arc::clone(&window_handlers),
                engine_stop.clone(),
                Arc::clone(&metrics),
                move |worker_id| {
                    Box::new(EngineProcessingContext::new(
                        worker_id,
                        Arc::clone(&pool_for_workers),
                        Arc::clone(&queue_for_workers),
                        worker_pool_context_stop.clone(),
                    ))
                },
            )
        };

        Ok(Self {
            pool,
            queue,
            registry,
            window_handlers,
            engine_stop,
            workers: Mutex::new(Some(worker_pool)),
            queries: Mutex::new(HashMap::new()),
            next_query_id: AtomicU64::new(1),
            metrics,
            query_stop_timeout_ms: config.query_stop_timeout_ms(),
        })
    }

    /// Exposes the Prometheus registry backing this engine's metrics, for
    /// whatever HTTP surface the embedding process scrapes from.
    pub fn metrics_registry(&self) -> &prometheus::Registry {
        self.metrics.registry()
    }

    /// Compiles every pipeline in `plan` and registers it with the shared
    /// worker pool. `sources`/`sinks` supply the adapters for pipelines whose
    /// id appears in the corresponding map; every other pipeline is a pure
    /// operator.
    pub fn register_query(
        &self,
        plan: QueryPlan,
        sources: HashMap<PipelineId, Arc<dyn Source>>,
        sinks: HashMap<PipelineId, Arc<dyn Sink>>,
    ) -> Result<QueryId, EngineError> {
        let query_id = QueryId::new(self.next_query_id.fetch_add(1, Ordering::AcqRel));
        let num_workers = self.workers.lock().as_ref().map(|w| w.worker_count()).unwrap_or(1);

        // Build-side join engines, and the left/right schema widths a probe
        // needs to merge rows, are shared between the two build pipelines of
        // one join; `trigger_target` (the probe pipeline's id) is the key
        // both build sides agree on.
        let mut hash_joins: HashMap<PipelineId, Arc<HashJoinEngine<u64, row::Row>>> = HashMap::new();
        let mut nested_loop_joins: HashMap<PipelineId, Arc<NestedLoopJoinEngine<row::Row>>> = HashMap::new();
        let mut join_side_lens: HashMap<PipelineId, (usize, usize)> = HashMap::new();

        let mut graph = PipelineGraph::new();
        let mut schema_lens = HashMap::new();
        let mut pipeline_ids = Vec::with_capacity(plan.pipelines.len());
        let mut handlers_by_target: HashMap<PipelineId, Arc<WindowOperatorHandler>> = HashMap::new();

        for spec in &plan.pipelines {
            let role = if sources.contains_key(&spec.id) {
                PipelineRole::Source
            } else if sinks.contains_key(&spec.id) {
                PipelineRole::Sink
            } else {
                PipelineRole::Operator
            };
            graph.insert(Pipeline::new(spec.id, role, spec.stages.clone()));
            schema_lens.insert(spec.id, spec.schema.len());
            pipeline_ids.push(spec.id);

            if let Some(trigger) = &spec.window {
                let handler = handlers_by_target
                    .entry(trigger.trigger_target)
                    .or_insert_with(|| Arc::new(WindowOperatorHandler::new(trigger.trigger_target, trigger.definition.assigner(), trigger.expected_origins)))
                    .clone();
                self.window_handlers.register(spec.id, handler);

                for stage in &spec.stages {
                    let arity = match &stage.kind {
                        OperatorKind::HashJoinBuild { arity, .. } => Some(*arity),
                        OperatorKind::NljBuild { arity, .. } => Some(*arity),
                        _ => None,
                    };
                    if let Some(arity) = arity {
                        let entry = join_side_lens.entry(trigger.trigger_target).or_insert((0, 0));
                        match arity {
                            Arity::BinaryLeft => entry.0 = spec.schema.len(),
                            Arity::BinaryRight => entry.1 = spec.schema.len(),
                            Arity::Unary => {}
                        }
                    }
                }
            }
        }
        for spec in &plan.pipelines {
            for &successor in &spec.successors {
                graph.link(spec.id, successor);
            }
        }

        for spec in &plan.pipelines {
            let runtime = self.compile_pipeline(spec, &sinks, num_workers, &mut hash_joins, &mut nested_loop_joins, &join_side_lens)?;
            self.registry.register(spec.id, runtime);
        }

        let ctx = EngineProcessingContext::new(0, Arc::clone(&self.pool), Arc::clone(&self.queue), self.engine_stop.clone());
        for &id in &pipeline_ids {
            if let Some(runtime) = self.registry.get(id) {
                runtime.setup(&ctx)?;
            }
        }

        let running = RunningQuery {
            pipeline_ids: pipeline_ids.clone(),
            sources,
            schema_lens,
            stop_order: graph.topological_stop_order(),
            query_stop: StopToken::new(),
            source_threads: Vec::new(),
            started: false,
            max_watermark_ts: Arc::new(AtomicU64::new(0)),
        };
        self.queries.lock().insert(query_id, running);
        self.metrics.query_registered();
        info!(%query_id, pipelines = pipeline_ids.len(), "query registered");
        Ok(query_id)
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_pipeline(
        &self,
        spec: &PipelineSpec,
        sinks: &HashMap<PipelineId, Arc<dyn Sink>>,
        num_workers: usize,
        hash_joins: &mut HashMap<PipelineId, Arc<HashJoinEngine<u64, row::Row>>>,
        nested_loop_joins: &mut HashMap<PipelineId, Arc<NestedLoopJoinEngine<row::Row>>>,
        join_side_lens: &HashMap<PipelineId, (usize, usize)>,
    ) -> Result<Arc<dyn PipelineStageRuntime>, EngineError> {
        if let Some(sink) = sinks.get(&spec.id) {
            return Ok(Arc::new(SinkRuntime::new(Arc::clone(sink))));
        }

        for stage in &spec.stages {
            match &stage.kind {
                OperatorKind::WindowBuild { window, time_field, aggregate_field, group_by_field } => {
                    let engine = Arc::new(AggregationEngine::<u64, SumState>::new(SumState, num_workers));
                    let runtime = WindowRuntime::new(
                        &spec.schema,
                        time_field,
                        aggregate_field,
                        group_by_field.as_deref(),
                        window.assigner(),
                        engine,
                        spec.successors.clone(),
                    )?;
                    return Ok(Arc::new(runtime));
                }
                OperatorKind::HashJoinBuild { key_field, time_field, arity } => {
                    let trigger_target = spec
                        .window
                        .as_ref()
                        .map(|w| w.trigger_target)
                        .ok_or_else(|| EngineError::invariant("hash join build pipeline is missing its window trigger"))?;
                    let assigner = spec.window.as_ref().expect("checked above").definition.assigner();
                    let engine = hash_joins.entry(trigger_target).or_insert_with(|| Arc::new(HashJoinEngine::new(num_workers))).clone();
                    let runtime = HashJoinBuildRuntime::new(&spec.schema, time_field, key_field, *arity, assigner, engine)?;
                    return Ok(Arc::new(runtime));
                }
                OperatorKind::HashJoinProbe { .. } => {
                    let engine = hash_joins.entry(spec.id).or_insert_with(|| Arc::new(HashJoinEngine::new(num_workers))).clone();
                    let (left_len, right_len) = join_side_lens.get(&spec.id).copied().unwrap_or((spec.schema.len(), 0));
                    let runtime = HashJoinProbeRuntime::new(left_len, right_len, JoinType::Inner, engine, spec.successors.clone());
                    return Ok(Arc::new(runtime));
                }
                OperatorKind::NljBuild { time_field, arity } => {
                    let trigger_target = spec
                        .window
                        .as_ref()
                        .map(|w| w.trigger_target)
                        .ok_or_else(|| EngineError::invariant("nested-loop join build pipeline is missing its window trigger"))?;
                    let assigner = spec.window.as_ref().expect("checked above").definition.assigner();
                    let engine = nested_loop_joins
                        .entry(trigger_target)
                        .or_insert_with(|| Arc::new(NestedLoopJoinEngine::new(num_workers)))
                        .clone();
                    let runtime = NljBuildRuntime::new(&spec.schema, time_field, *arity, assigner, engine)?;
                    return Ok(Arc::new(runtime));
                }
                OperatorKind::NljProbe => {
                    let engine = nested_loop_joins.entry(spec.id).or_insert_with(|| Arc::new(NestedLoopJoinEngine::new(num_workers))).clone();
                    let (left_len, right_len) = join_side_lens.get(&spec.id).copied().unwrap_or((spec.schema.len(), 0));
                    let runtime = NljProbeRuntime::new(left_len, right_len, JoinType::Inner, engine, spec.successors.clone());
                    return Ok(Arc::new(runtime));
                }
                OperatorKind::Scan { .. } | OperatorKind::Emit | OperatorKind::Filter { .. } | OperatorKind::Map { .. } | OperatorKind::WindowProbe { .. } => {}
            }
        }
        Ok(Arc::new(ChainRuntime::new(&spec.schema, &spec.stages, spec.successors.clone())?))
    }

    /// Spawns one blocking-read thread per source adapter registered for
    /// `query_id`. Each thread fills buffers until `FillResult::EndOfStream`,
    /// stamping `(origin_id, sequence_number)` and deriving
    /// the buffer's watermark from the schema's last column.
    pub fn start_query(&self, query_id: QueryId) -> Result<(), EngineError> {
        let mut queries = self.queries.lock();
        let running = queries.get_mut(&query_id).ok_or(EngineError::QueryNotFound(query_id.value()))?;
        if running.started {
            return Err(EngineError::QueryAlreadyRunning(query_id.value()));
        }
        running.started = true;

        for (&pipeline_id, source) in &running.sources {
            let source = Arc::clone(source);
            let pool = Arc::clone(&self.pool);
            let queue = Arc::clone(&self.queue);
            let stop = running.query_stop.clone();
            let schema_len = *running.schema_lens.get(&pipeline_id).unwrap_or(&1);
            let metrics = Arc::clone(&self.metrics);
            let max_watermark_ts = Arc::clone(&running.max_watermark_ts);
            let handle = std::thread::Builder::new()
                .name(format!("nes-source-{}", pipeline_id.value()))
                .spawn(move || run_source_loop(pipeline_id, source, pool, queue, stop, schema_len, metrics, max_watermark_ts))
                .expect("failed to spawn source thread");
            running.source_threads.push(handle);
        }
        info!(%query_id, "query started");
        Ok(())
    }

    /// Stops every source thread for `query_id`, flushes every window
    /// handler watching one of its pipelines through the highest event-time
    /// any of its sources observed, waits for the resulting trigger tasks to
    /// drain, runs each compiled pipeline's `stop` hook in stop order, and
    /// deregisters the query.
    ///
    /// The flush is what makes a finite source's final partial window (e.g.
    /// a tumbling `[5,10)` slice whose last record sits at `ts=9`) fire at
    /// all: absent it, that window's end never falls below a watermark that
    /// advanced as far as the stream's last record, since nothing after the
    /// last buffer would ever move the watermark again.
    pub fn stop_query(&self, query_id: QueryId) -> Result<(), EngineError> {
        let running = {
            let mut queries = self.queries.lock();
            queries.remove(&query_id).ok_or(EngineError::QueryNotFound(query_id.value()))?
        };
        running.query_stop.stop();
        for handle in running.source_threads {
            let _ = handle.join();
        }

        let max_ts = running.max_watermark_ts.load(Ordering::Acquire);
        let mut flushed_targets = Vec::new();
        for &id in &running.pipeline_ids {
            if let Some(handler) = self.window_handlers.get(id) {
                let target = handler.pipeline_id();
                if !flushed_targets.contains(&target) {
                    handler.flush_through(max_ts, &self.queue);
                    flushed_targets.push(target);
                }
            }
        }
        if !flushed_targets.is_empty() {
            let deadline = std::time::Instant::now() + std::time::Duration::from_millis(self.query_stop_timeout_ms);
            let mut idle_polls = 0;
            while idle_polls < 2 && std::time::Instant::now() < deadline {
                if self.queue.admission_len() == 0 && self.queue.internal_len() == 0 {
                    idle_polls += 1;
                } else {
                    idle_polls = 0;
                }
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
        }

        let ctx = EngineProcessingContext::new(0, Arc::clone(&self.pool), Arc::clone(&self.queue), self.engine_stop.clone());
        for &id in &running.stop_order {
            if let Some(runtime) = self.registry.get(id) {
                if let Err(err) = runtime.stop(&ctx) {
                    error!(%query_id, ?id, %err, "pipeline stop hook failed");
                }
            }
        }
        for id in &running.pipeline_ids {
            self.registry.deregister(*id);
        }
        self.metrics.query_stopped();
        info!(%query_id, "query stopped");
        Ok(())
    }

    /// Stops the shared worker pool. No query may be started after this.
    pub fn shutdown(self) {
        self.engine_stop.stop();
        if let Some(pool) = self.workers.lock().take() {
            pool.stop_and_join();
        }
        self.pool.close();
    }
}

#[allow(clippy::too_many_arguments)]
fn run_source_loop(
    pipeline_id: PipelineId,
    source: Arc<dyn Source>,
    pool: Arc<BufferPool>,
    queue: Arc<TaskQueue>,
    stop: StopToken,
    schema_len: usize,
    metrics: Arc<EngineMetrics>,
    max_watermark_ts: Arc<AtomicU64>,
) {
    let origin = OriginId::new(pipeline_id.value());
    let mut seq = SequenceNumber::INITIAL;
    loop {
        if stop.is_stopped() {
            return;
        }
        let metadata = BufferMetadata::new(origin, seq, 0);
        let mut buffer = match pool.acquire(metadata, &stop) {
            Ok(buffer) => buffer,
            Err(_) => return,
        };
        match source.fill_buffer(&mut buffer, pipeline_id.value(), &stop as &dyn StopSignal) {
            FillResult::Data(tuples) => {
                if let Err(err) = buffer.set_tuple_count(tuples, schema_len * std::mem::size_of::<f64>()) {
                    error!(?pipeline_id, %err, "source produced more tuples than the buffer could hold");
                    return;
                }
                let watermark_ts = row::read_rows(&buffer, schema_len).iter().map(|r| r[schema_len - 1] as u64).max().unwrap_or(0);
                buffer.set_metadata(metadata.with_watermark(watermark_ts));
                max_watermark_ts.fetch_max(watermark_ts, Ordering::AcqRel);
                if !queue.submit_admission(Task::execute_pipeline(pipeline_id, buffer), &stop) {
                    return;
                }
                metrics.set_queue_depth((queue.admission_len() + queue.internal_len()) as i64);
                seq = seq.next();
            }
            FillResult::EndOfStream => return,
            FillResult::Error(reason) => {
                warn!(?pipeline_id, reason, "source reported an error; stopping its feed");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::WindowTrigger;
    use crate::query::row::Schema;
    use std::sync::atomic::AtomicUsize;
    use streaming_domain::entities::PipelineStage;
    use streaming_domain::value_objects::{TimeField, WindowDefinition};

    struct CountingSource {
        schema: Schema,
        remaining: AtomicUsize,
    }

    impl Source for CountingSource {
        fn fill_buffer(&self, buffer: &mut streaming_domain::entities::TupleBuffer, _schema_id: u64, _stop: &dyn StopSignal) -> FillResult {
            if self.remaining.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1)).is_err() {
                return FillResult::EndOfStream;
            }
            row::write_rows(buffer, &[vec![1.0, 42.0, 5.0]], self.schema.len()).unwrap();
            FillResult::Data(1)
        }
    }

    struct CollectingSink {
        buffers: Mutex<Vec<Vec<row::Row>>>,
    }

    impl Sink for CollectingSink {
        fn on_buffer(&self, buffer: streaming_domain::entities::TupleBuffer) -> Result<(), EngineError> {
            self.buffers.lock().push(row::read_rows(&buffer, 3));
            Ok(())
        }
    }

    fn test_config() -> EngineConfig {
        EngineConfig::builder().number_of_worker_threads(2).admission_queue_size(16).operator_buffer_size(256).build().unwrap()
    }

    #[test]
    fn a_plain_chain_runs_end_to_end_from_source_to_sink() {
        let engine = QueryEngine::start(&test_config()).unwrap();
        let source_id = PipelineId::new(1);
        let sink_id = PipelineId::new(2);
        let schema: Schema = vec!["id".into(), "val".into(), "ts".into()];
        let plan = QueryPlan::new()
            .with_pipeline(PipelineSpec {
                id: source_id,
                schema: schema.clone(),
                stages: vec![PipelineStage::new(0, OperatorKind::Scan { origin_schema_id: 1 })],
                successors: vec![sink_id],
                window: None,
            })
            .with_pipeline(PipelineSpec {
                id: sink_id,
                schema,
                stages: vec![PipelineStage::new(0, OperatorKind::Emit)],
                successors: vec![],
                window: None,
            });

        let source = Arc::new(CountingSource { schema: vec!["id".into(), "val".into(), "ts".into()], remaining: AtomicUsize::new(3) });
        let sink = Arc::new(CollectingSink { buffers: Mutex::new(Vec::new()) });

        let mut sources: HashMap<PipelineId, Arc<dyn Source>> = HashMap::new();
        sources.insert(source_id, source);
        let mut sinks: HashMap<PipelineId, Arc<dyn Sink>> = HashMap::new();
        sinks.insert(sink_id, Arc::clone(&sink) as Arc<dyn Sink>);

        let query_id = engine.register_query(plan, sources, sinks).unwrap();
        engine.start_query(query_id).unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while sink.buffers.lock().len() < 3 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(20));
        }

        engine.stop_query(query_id).unwrap();
        assert_eq!(sink.buffers.lock().len(), 3);
        engine.shutdown();
    }

    #[test]
    fn register_query_rejects_a_second_start() {
        let engine = QueryEngine::start(&test_config()).unwrap();
        let sink_id = PipelineId::new(1);
        let schema: Schema = vec!["id".into(), "val".into(), "ts".into()];
        let plan = QueryPlan::new().with_pipeline(PipelineSpec {
            id: sink_id,
            schema,
            stages: vec![PipelineStage::new(0, OperatorKind::Emit)],
            successors: vec![],
            window: None,
        });
        let sink = Arc::new(CollectingSink { buffers: Mutex::new(Vec::new()) });
        let mut sinks: HashMap<PipelineId, Arc<dyn Sink>> = HashMap::new();
        sinks.insert(sink_id, sink as Arc<dyn Sink>);
        let query_id = engine.register_query(plan, HashMap::new(), sinks).unwrap();
        engine.start_query(query_id).unwrap();
        assert!(matches!(engine.start_query(query_id), Err(EngineError::QueryAlreadyRunning(_))));
        engine.stop_query(query_id).unwrap();
        engine.shutdown();
    }

    #[test]
    fn window_trigger_is_shared_across_both_build_sides_of_a_join() {
        let engine = QueryEngine::start(&test_config()).unwrap();
        let left_build = PipelineId::new(1);
        let right_build = PipelineId::new(2);
        let probe = PipelineId::new(3);
        let schema: Schema = vec!["key".into(), "val".into(), "ts".into()];
        let window = WindowDefinition::tumbling(10, TimeField::EventTime).unwrap();
        let trigger = WindowTrigger { definition: window, trigger_target: probe, expected_origins: 2 };
        let plan = QueryPlan::new()
            .with_pipeline(PipelineSpec {
                id: left_build,
                schema: schema.clone(),
                stages: vec![PipelineStage::new(
                    0,
                    OperatorKind::HashJoinBuild { key_field: "key".into(), time_field: "ts".into(), arity: Arity::BinaryLeft },
                )],
                successors: vec![],
                window: Some(trigger.clone()),
            })
            .with_pipeline(PipelineSpec {
                id: right_build,
                schema: schema.clone(),
                stages: vec![PipelineStage::new(
                    0,
                    OperatorKind::HashJoinBuild { key_field: "key".into(), time_field: "ts".into(), arity: Arity::BinaryRight },
                )],
                successors: vec![],
                window: Some(trigger),
            })
            .with_pipeline(PipelineSpec {
                id: probe,
                schema,
                stages: vec![PipelineStage::new(0, OperatorKind::HashJoinProbe { key_field: "key".into() })],
                successors: vec![],
                window: None,
            });
        let query_id = engine.register_query(plan, HashMap::new(), HashMap::new()).unwrap();
        assert_eq!(engine.window_handlers.len(), 2);
        engine.stop_query(query_id).unwrap();
        engine.shutdown();
    }
}
