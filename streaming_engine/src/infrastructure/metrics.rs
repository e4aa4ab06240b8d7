// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Process-wide Prometheus metrics for the query engine: task throughput,
//! pipeline errors, and the handful of system gauges an operator needs to
//! tell a healthy engine from a backed-up one. A scrape endpoint is outside
//! this core's scope; `registry()` hands back the `prometheus::Registry` so
//! whatever HTTP surface embeds this engine can expose it.

use prometheus::{IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;
use streaming_domain::error::EngineError;

/// All counters and gauges registered under the `nes_engine` namespace.
pub struct EngineMetrics {
    registry: Arc<Registry>,
    tasks_executed_total: IntCounter,
    pipeline_errors_total: IntCounter,
    buffers_produced_total: IntCounter,
    active_queries: IntGauge,
    task_queue_depth: IntGauge,
}

impl EngineMetrics {
    pub fn new() -> Result<Self, EngineError> {
        let registry = Registry::new();

        let tasks_executed_total = IntCounter::with_opts(
            Opts::new("tasks_executed_total", "Total tasks dequeued and dispatched by the worker pool").namespace("nes_engine"),
        )
        .map_err(|e| EngineError::invariant(format!("failed to create tasks_executed_total metric: {e}")))?;

        let pipeline_errors_total = IntCounter::with_opts(
            Opts::new("pipeline_errors_total", "Total pipeline executions that returned an error").namespace("nes_engine"),
        )
        .map_err(|e| EngineError::invariant(format!("failed to create pipeline_errors_total metric: {e}")))?;

        let buffers_produced_total = IntCounter::with_opts(
            Opts::new("buffers_produced_total", "Total downstream buffers produced by compiled pipelines").namespace("nes_engine"),
        )
        .map_err(|e| EngineError::invariant(format!("failed to create buffers_produced_total metric: {e}")))?;

        let active_queries = IntGauge::with_opts(Opts::new("active_queries", "Number of currently registered queries").namespace("nes_engine"))
            .map_err(|e| EngineError::invariant(format!("failed to create active_queries metric: {e}")))?;

        let task_queue_depth = IntGauge::with_opts(Opts::new("task_queue_depth", "Combined admission + internal task queue depth").namespace("nes_engine"))
            .map_err(|e| EngineError::invariant(format!("failed to create task_queue_depth metric: {e}")))?;

        registry
            .register(Box::new(tasks_executed_total.clone()))
            .map_err(|e| EngineError::invariant(format!("failed to register tasks_executed_total: {e}")))?;
        registry
            .register(Box::new(pipeline_errors_total.clone()))
            .map_err(|e| EngineError::invariant(format!("failed to register pipeline_errors_total: {e}")))?;
        registry
            .register(Box::new(buffers_produced_total.clone()))
            .map_err(|e| EngineError::invariant(format!("failed to register buffers_produced_total: {e}")))?;
        registry
            .register(Box::new(active_queries.clone()))
            .map_err(|e| EngineError::invariant(format!("failed to register active_queries: {e}")))?;
        registry
            .register(Box::new(task_queue_depth.clone()))
            .map_err(|e| EngineError::invariant(format!("failed to register task_queue_depth: {e}")))?;

        Ok(Self {
            registry: Arc::new(registry),
            tasks_executed_total,
            pipeline_errors_total,
            buffers_produced_total,
            active_queries,
            task_queue_depth,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_task_executed(&self) {
        self.tasks_executed_total.inc();
    }

    pub fn record_pipeline_error(&self) {
        self.pipeline_errors_total.inc();
    }

    pub fn record_buffers_produced(&self, n: u64) {
        self.buffers_produced_total.inc_by(n);
    }

    pub fn query_registered(&self) {
        self.active_queries.inc();
    }

    pub fn query_stopped(&self) {
        self.active_queries.dec();
    }

    pub fn set_queue_depth(&self, depth: i64) {
        self.task_queue_depth.set(depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_accumulate() {
        let metrics = EngineMetrics::new().unwrap();
        assert_eq!(metrics.tasks_executed_total.get(), 0);
        metrics.record_task_executed();
        metrics.record_task_executed();
        assert_eq!(metrics.tasks_executed_total.get(), 2);
    }

    #[test]
    fn active_queries_gauge_tracks_register_and_stop() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.query_registered();
        metrics.query_registered();
        assert_eq!(metrics.active_queries.get(), 2);
        metrics.query_stopped();
        assert_eq!(metrics.active_queries.get(), 1);
    }

    #[test]
    fn registry_exposes_every_registered_metric() {
        let metrics = EngineMetrics::new().unwrap();
        let families = metrics.registry().gather();
        assert_eq!(families.len(), 5);
    }
}
