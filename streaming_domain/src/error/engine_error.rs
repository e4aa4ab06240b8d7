// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Error System
//!
//! The error kinds a query can fail with, propagated as a tagged sum type
//! across worker threads and surfaced through the per-query status channel.
//! Each kind carries its own recoverability and its own "who sees this"
//! contract (e.g. `BufferPoolExhausted` is transient back-pressure and is
//! never reported unless a stop token fires mid-wait).

use thiserror::Error;

/// Errors that can occur within the streaming execution core.
///
/// `PipelineExecutionError` and `InvariantViolated` both abandon the task
/// that raised them, but only `InvariantViolated` is fatal to the query in
/// release builds as well as debug builds — it means an internal contract
/// (e.g. the chunk sequencer) was broken, not that compiled user code threw.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    #[error("schema mismatch on origin {origin}: {reason}")]
    SchemaMismatch { origin: u64, reason: String },

    #[error("buffer pool exhausted")]
    BufferPoolExhausted,

    #[error("pipeline execution error in pipeline {pipeline_id}: {reason}")]
    PipelineExecutionError { pipeline_id: u64, reason: String },

    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    #[error("query stop timed out after {elapsed_ms}ms")]
    QueryStopTimeout { elapsed_ms: u64 },

    #[error("query {0} not found")]
    QueryNotFound(u64),

    #[error("query {0} already running")]
    QueryAlreadyRunning(u64),

    #[error("io error: {0}")]
    IoError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl EngineError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolated(msg.into())
    }

    pub fn processing_failed(pipeline_id: u64, reason: impl Into<String>) -> Self {
        Self::PipelineExecutionError {
            pipeline_id,
            reason: reason.into(),
        }
    }

    pub fn invalid_window_definition(reason: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(reason.into())
    }

    /// Whether a caller may retry the operation that produced this error.
    ///
    /// Pool exhaustion is back-pressure, not failure, and I/O hiccups on a
    /// source are transient; everything else is a terminal condition for the
    /// query that raised it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EngineError::BufferPoolExhausted | EngineError::IoError(_))
    }

    /// Whether this error is fatal to the process (debug) or the query
    /// (release).
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, EngineError::InvariantViolated(_))
    }

    pub fn category(&self) -> &'static str {
        match self {
            EngineError::ConfigurationInvalid(_) => "configuration",
            EngineError::SchemaMismatch { .. } => "schema",
            EngineError::BufferPoolExhausted => "resource",
            EngineError::PipelineExecutionError { .. } => "processing",
            EngineError::InvariantViolated(_) => "invariant",
            EngineError::QueryStopTimeout { .. } => "timeout",
            EngineError::QueryNotFound(_) => "query",
            EngineError::QueryAlreadyRunning(_) => "query",
            EngineError::IoError(_) => "io",
            EngineError::SerializationError(_) => "serialization",
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::SerializationError(err.to_string())
    }
}
