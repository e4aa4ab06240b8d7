// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Bootstrap entry point for the streaming execution core. Parses and
//! validates the CLI, loads an `EngineConfig`, and either
//! validates a query plan/config file or boots the shared runtime and
//! drives a plan to completion until an interrupt signal or a graceful
//! `stop_query` deadline (a ~30s default).
//!
//! Source and sink adapters are out of this core's scope; the
//! `run` command registers a plan with no adapters wired in, which is
//! enough to exercise the full `register_query` / `start_query` /
//! `stop_query` lifecycle against pure-operator and already-closed
//! pipelines. Wiring real adapters is left to an embedding application.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use streaming_bootstrap::cli::{ValidatedCli, ValidatedCommand};
use streaming_bootstrap::config::EngineConfig;
use streaming_bootstrap::exit_code::{map_error_to_exit_code, ExitCode};
use streaming_bootstrap::shutdown::ShutdownCoordinator;
use streaming_bootstrap::signals::create_signal_handler;
use streaming_engine::query::engine::QueryEngine;
use streaming_engine::query::plan::QueryPlan;
use tracing::{error, info};

fn init_tracing(verbose: bool) {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn load_config(cli: &ValidatedCli) -> Result<EngineConfig, streaming_domain::error::EngineError> {
    let mut builder = match &cli.config {
        Some(path) => EngineConfig::builder().from_base(EngineConfig::from_yaml_file(path)?),
        None => EngineConfig::builder(),
    };
    if let Some(threads) = cli.worker_threads {
        builder = builder.number_of_worker_threads(threads);
    }
    if let Some(size) = cli.admission_queue_size {
        builder = builder.admission_queue_size(size);
    }
    builder.build()
}

fn load_plan(path: &Path) -> Result<QueryPlan, streaming_domain::error::EngineError> {
    let contents = std::fs::read_to_string(path)?;
    let plan: QueryPlan = serde_json::from_str(&contents)?;
    Ok(plan)
}

/// Registers `plan` against a freshly booted engine with no source/sink
/// adapters, starts it, blocks until an OS shutdown signal arrives, then
/// stops the query within its graceful-stop deadline and
/// shuts the engine down.
async fn run_plan(config: EngineConfig, plan: QueryPlan, stop_timeout_ms: Option<u64>) -> Result<(), streaming_domain::error::EngineError> {
    let stop_deadline = Duration::from_millis(stop_timeout_ms.unwrap_or_else(|| config.query_stop_timeout_ms()));
    let engine = QueryEngine::start(&config)?;
    let query_id = engine.register_query(plan, HashMap::new(), HashMap::new())?;
    engine.start_query(query_id)?;
    info!(%query_id, "query running; press Ctrl+C or send SIGTERM to stop");

    let coordinator = Arc::new(ShutdownCoordinator::new(stop_deadline));
    let token = coordinator.token();
    let signal_handler = create_signal_handler();
    signal_handler.wait_for_signal(Box::new(move || token.cancel())).await;

    info!(%query_id, "shutdown requested, stopping query");
    let engine = Arc::new(engine);
    let stopping_engine = Arc::clone(&engine);
    let stop_handle = tokio::task::spawn_blocking(move || stopping_engine.stop_query(query_id));
    let stop_result = match tokio::time::timeout(stop_deadline, stop_handle).await {
        Ok(joined) => joined.map_err(|e| streaming_domain::error::EngineError::invariant(format!("stop_query task panicked: {e}")))?,
        Err(_) => Err(streaming_domain::error::EngineError::QueryStopTimeout { elapsed_ms: stop_deadline.as_millis() as u64 }),
    };

    if let Ok(engine) = Arc::try_unwrap(engine) {
        engine.shutdown();
    }
    stop_result
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match streaming_bootstrap::bootstrap_cli() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("argument error: {err}");
            return std::process::ExitCode::from(ExitCode::UsageError.as_i32() as u8);
        }
    };

    init_tracing(cli.verbose);

    let result = dispatch(cli).await;
    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            std::process::ExitCode::from(map_error_to_exit_code(&err).as_i32() as u8)
        }
    }
}

async fn dispatch(cli: ValidatedCli) -> Result<(), streaming_domain::error::EngineError> {
    match cli.command {
        ValidatedCommand::ShowConfig => {
            let config = load_config(&cli)?;
            println!("{}", serde_yaml::to_string(&config).map_err(|e| streaming_domain::error::EngineError::SerializationError(e.to_string()))?);
            Ok(())
        }
        ValidatedCommand::ValidateConfig { config } => {
            let config = EngineConfig::from_yaml_file(&config)?;
            config.validate()?;
            println!("configuration valid: {} worker threads", config.number_of_worker_threads());
            Ok(())
        }
        ValidatedCommand::ValidatePlan { plan } => {
            let plan = load_plan(&plan)?;
            println!("plan valid: {} pipelines", plan.pipelines.len());
            Ok(())
        }
        ValidatedCommand::Run { plan, stop_timeout_ms } => {
            let config = load_config(&cli)?;
            let plan = load_plan(&plan)?;
            run_plan(config, plan, stop_timeout_ms).await
        }
    }
}
