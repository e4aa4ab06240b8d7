// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse()                 │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration: every path an operator supplied has been
/// canonicalized and security-checked; every numeric override has been
/// range-checked. The rest of the bootstrap layer only ever sees this.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub worker_threads: Option<u16>,
    pub admission_queue_size: Option<u32>,
}

/// Validated command variants, mirroring [`Commands`] but with every path
/// already resolved to a canonical, security-checked form.
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run {
        plan: PathBuf,
        stop_timeout_ms: Option<u64>,
    },
    ValidatePlan {
        plan: PathBuf,
    },
    ValidateConfig {
        config: PathBuf,
    },
    ShowConfig,
}

/// Parse and validate CLI arguments
///
/// This function combines parsing and validation:
/// 1. Parse CLI with clap
/// 2. Validate all paths with `SecureArgParser`
/// 3. Validate all numeric overrides
/// 4. Return `ValidatedCli` on success
///
/// # Errors
///
/// Returns `ParseError` if any validation fails
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

/// Validate parsed CLI arguments: path canonicalization/security checks
/// plus numeric range validation (the full bounds are re-checked by
/// `EngineConfig::validate` once the config is actually built; this layer
/// only rejects obviously-malformed CLI input before it reaches that).
fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        Some(SecureArgParser::validate_path(&path.to_string_lossy())?)
    } else {
        None
    };

    if let Some(threads) = cli.worker_threads {
        if threads == 0 || threads > 1024 {
            return Err(ParseError::InvalidValue {
                arg: "worker-threads".to_string(),
                reason: "must be between 1 and 1024".to_string(),
            });
        }
    }

    if let Some(size) = cli.admission_queue_size {
        if size == 0 {
            return Err(ParseError::InvalidValue {
                arg: "admission-queue-size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
    }

    let command = match cli.command {
        Commands::Run { plan, stop_timeout_ms } => {
            let validated_plan = SecureArgParser::validate_path(&plan.to_string_lossy())?;
            if let Some(ms) = stop_timeout_ms {
                if ms == 0 {
                    return Err(ParseError::InvalidValue {
                        arg: "stop-timeout-ms".to_string(),
                        reason: "must be greater than 0".to_string(),
                    });
                }
            }
            ValidatedCommand::Run {
                plan: validated_plan,
                stop_timeout_ms,
            }
        }
        Commands::ValidatePlan { plan } => {
            let validated_plan = SecureArgParser::validate_path(&plan.to_string_lossy())?;
            ValidatedCommand::ValidatePlan { plan: validated_plan }
        }
        Commands::ValidateConfig { config } => {
            let validated_config = SecureArgParser::validate_path(&config.to_string_lossy())?;
            ValidatedCommand::ValidateConfig { config: validated_config }
        }
        Commands::ShowConfig => ValidatedCommand::ShowConfig,
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
        worker_threads: cli.worker_threads,
        admission_queue_size: cli.admission_queue_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_worker_threads_override() {
        let cli = Cli {
            command: Commands::ShowConfig,
            verbose: false,
            config: None,
            worker_threads: Some(0),
            admission_queue_size: None,
        };
        assert!(matches!(validate_cli(cli), Err(ParseError::InvalidValue { .. })));
    }

    #[test]
    fn rejects_worker_threads_override_above_max() {
        let cli = Cli {
            command: Commands::ShowConfig,
            verbose: false,
            config: None,
            worker_threads: Some(2000),
            admission_queue_size: None,
        };
        assert!(matches!(validate_cli(cli), Err(ParseError::InvalidValue { .. })));
    }

    #[test]
    fn show_config_needs_no_path_validation() {
        let cli = Cli {
            command: Commands::ShowConfig,
            verbose: true,
            config: None,
            worker_threads: None,
            admission_queue_size: None,
        };
        let validated = validate_cli(cli).unwrap();
        assert!(matches!(validated.command, ValidatedCommand::ShowConfig));
        assert!(validated.verbose);
    }
}
