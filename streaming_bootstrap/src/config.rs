// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration
//!
//! Bootstrap-phase configuration for the streaming execution core: the
//! recognised YAML/CLI keys, their defaults, and the validation that turns
//! a raw `EngineConfig` into one ready for `register_query`.
//!
//! ## Design Philosophy
//!
//! `EngineConfig` holds **validated** configuration after:
//! 1. YAML file load (via the `config` crate's layered sources)
//! 2. CLI override application
//! 3. Default value application
//! 4. Range/shape validation against documented bounds
//!
//! ## Immutability
//!
//! All configuration is immutable after `validate()` succeeds: thread safety
//! with no synchronization, and predictable behavior once a query starts.
//!
//! ## Usage
//!
//! ```rust
//! use streaming_bootstrap::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .number_of_worker_threads(8)
//!     .admission_queue_size(2000)
//!     .build()
//!     .expect("valid configuration");
//!
//! assert_eq!(config.number_of_worker_threads(), 8);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use streaming_domain::error::EngineError;

/// Compiler diagnostic dump mode (config key `queryCompilerDumpMode`).
/// Accepted and validated here, but the dump itself is produced by the
/// query compiler, which is out of this crate's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum QueryCompilerDumpMode {
    None,
    Console,
    File,
    Both,
}

impl Default for QueryCompilerDumpMode {
    fn default() -> Self {
        Self::None
    }
}

/// Compilation strategy (config key `compilationStrategy`); opaque
/// pass-through, the compiler back-end is external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CompilationStrategy {
    Fast,
    Debug,
    Optimize,
    ProxyInlining,
}

impl Default for CompilationStrategy {
    fn default() -> Self {
        Self::Fast
    }
}

/// Execution back-end for compiled pipelines (config key `nautilusBackend`);
/// opaque pass-through for the same reason as `CompilationStrategy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum NautilusBackend {
    Compiler,
    Interpreter,
}

impl Default for NautilusBackend {
    fn default() -> Self {
        Self::Compiler
    }
}

/// Validated engine configuration: every key the bootstrap layer recognises.
///
/// The four compiler-related keys (`query_compiler_dump_mode`,
/// `compilation_strategy`, `nautilus_backend`) are accepted and
/// shape-validated but otherwise inert here — the compiler back-end they
/// configure is an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    number_of_worker_threads: u16,
    admission_queue_size: u32,
    task_queue_size: u32,
    operator_buffer_size: u32,
    query_compiler_dump_mode: QueryCompilerDumpMode,
    compilation_strategy: CompilationStrategy,
    nautilus_backend: NautilusBackend,
    page_size: u32,
    /// Per-query graceful-stop deadline, in milliseconds (default ~30s).
    query_stop_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            number_of_worker_threads: 4,
            admission_queue_size: 1000,
            task_queue_size: 10_000,
            operator_buffer_size: 8192,
            query_compiler_dump_mode: QueryCompilerDumpMode::default(),
            compilation_strategy: CompilationStrategy::default(),
            nautilus_backend: NautilusBackend::default(),
            page_size: 10_240,
            query_stop_timeout_ms: 30_000,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Loads configuration from a YAML file, layered under the struct's
    /// defaults; CLI overrides are applied on top of the result.
    pub fn from_yaml_file(path: &Path) -> Result<Self, EngineError> {
        let source = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Yaml))
            .build()
            .map_err(|e| EngineError::ConfigurationInvalid(e.to_string()))?;
        let config: EngineConfig = source
            .try_deserialize()
            .map_err(|e| EngineError::ConfigurationInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn number_of_worker_threads(&self) -> u16 {
        self.number_of_worker_threads
    }

    pub fn admission_queue_size(&self) -> u32 {
        self.admission_queue_size
    }

    pub fn task_queue_size(&self) -> u32 {
        self.task_queue_size
    }

    pub fn operator_buffer_size(&self) -> u32 {
        self.operator_buffer_size
    }

    pub fn query_compiler_dump_mode(&self) -> QueryCompilerDumpMode {
        self.query_compiler_dump_mode
    }

    pub fn compilation_strategy(&self) -> CompilationStrategy {
        self.compilation_strategy
    }

    pub fn nautilus_backend(&self) -> NautilusBackend {
        self.nautilus_backend
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn query_stop_timeout_ms(&self) -> u64 {
        self.query_stop_timeout_ms
    }

    /// Validates configured bounds. Called automatically by
    /// `from_yaml_file` and the builder's `build`, and again by
    /// `register_query` since a query may carry per-query overrides.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(1..=1024).contains(&self.number_of_worker_threads) {
            return Err(EngineError::ConfigurationInvalid(format!(
                "numberOfWorkerThreads must be between 1 and 1024, got {}",
                self.number_of_worker_threads
            )));
        }
        if self.admission_queue_size == 0 {
            return Err(EngineError::ConfigurationInvalid(
                "admissionQueueSize must be greater than 0".into(),
            ));
        }
        if self.operator_buffer_size == 0 {
            return Err(EngineError::ConfigurationInvalid(
                "operatorBufferSize must be greater than 0".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(EngineError::ConfigurationInvalid("pageSize must be greater than 0".into()));
        }
        if self.query_stop_timeout_ms == 0 {
            return Err(EngineError::ConfigurationInvalid(
                "queryStopTimeoutMs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for `EngineConfig`, used both for YAML-loaded defaults and for
/// CLI overrides layered on top ("YAML defaults + CLI overrides").
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    base: Option<EngineConfig>,
    number_of_worker_threads: Option<u16>,
    admission_queue_size: Option<u32>,
    task_queue_size: Option<u32>,
    operator_buffer_size: Option<u32>,
    page_size: Option<u32>,
    query_stop_timeout_ms: Option<u64>,
}

impl EngineConfigBuilder {
    pub fn from_base(mut self, base: EngineConfig) -> Self {
        self.base = Some(base);
        self
    }

    pub fn number_of_worker_threads(mut self, value: u16) -> Self {
        self.number_of_worker_threads = Some(value);
        self
    }

    pub fn admission_queue_size(mut self, value: u32) -> Self {
        self.admission_queue_size = Some(value);
        self
    }

    pub fn task_queue_size(mut self, value: u32) -> Self {
        self.task_queue_size = Some(value);
        self
    }

    pub fn operator_buffer_size(mut self, value: u32) -> Self {
        self.operator_buffer_size = Some(value);
        self
    }

    pub fn page_size(mut self, value: u32) -> Self {
        self.page_size = Some(value);
        self
    }

    pub fn query_stop_timeout_ms(mut self, value: u64) -> Self {
        self.query_stop_timeout_ms = Some(value);
        self
    }

    pub fn build(self) -> Result<EngineConfig, EngineError> {
        let mut config = self.base.unwrap_or_default();
        if let Some(v) = self.number_of_worker_threads {
            config.number_of_worker_threads = v;
        }
        if let Some(v) = self.admission_queue_size {
            config.admission_queue_size = v;
        }
        if let Some(v) = self.task_queue_size {
            config.task_queue_size = v;
        }
        if let Some(v) = self.operator_buffer_size {
            config.operator_buffer_size = v;
        }
        if let Some(v) = self.page_size {
            config.page_size = v;
        }
        if let Some(v) = self.query_stop_timeout_ms {
            config.query_stop_timeout_ms = v;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = EngineConfig::default();
        assert_eq!(config.number_of_worker_threads(), 4);
        assert_eq!(config.admission_queue_size(), 1000);
        assert_eq!(config.task_queue_size(), 10_000);
        assert_eq!(config.page_size(), 10_240);
    }

    #[test]
    fn rejects_zero_worker_threads() {
        let err = EngineConfig::builder().number_of_worker_threads(0).build().unwrap_err();
        assert!(matches!(err, EngineError::ConfigurationInvalid(_)));
    }

    #[test]
    fn rejects_worker_threads_above_max() {
        assert!(EngineConfig::builder().number_of_worker_threads(2000).build().is_err());
    }

    #[test]
    fn builder_overrides_layer_on_top_of_a_base() {
        let base = EngineConfig::builder().number_of_worker_threads(8).build().unwrap();
        let overridden = EngineConfig::builder()
            .from_base(base)
            .admission_queue_size(5000)
            .build()
            .unwrap();
        assert_eq!(overridden.number_of_worker_threads(), 8);
        assert_eq!(overridden.admission_queue_size(), 5000);
    }

    #[test]
    fn rejects_zero_admission_queue_size() {
        assert!(EngineConfig::builder().admission_queue_size(0).build().is_err());
    }
}
