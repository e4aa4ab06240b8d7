// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Streaming Engine
//!
//! The runtime components of the streaming execution core: the buffer pool,
//! task queue, worker pool, pipeline stage runtime, emit sequencer,
//! watermark processor, slice store, aggregation engine, join engine, and
//! window operator handler, plus the [`query`] module that lowers a
//! [`query::plan::QueryPlan`] into compiled runtimes registered against them.
//!
//! ## Module structure
//!
//! - [`infrastructure::runtime`] — the shared runtime (C1-C3, C5-C10)
//! - [`query`] — plan descriptor, row encoding, compiled pipeline stages,
//!   and [`query::engine::QueryEngine`], the crate's composition root

pub mod infrastructure;
pub mod query;

pub use query::engine::QueryEngine;
pub use query::plan::{PipelineSpec, QueryPlan, WindowTrigger};
