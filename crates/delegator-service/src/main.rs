//! Main entry point for the delegation command-line tool.
//!
//! Loads the configuration, wires the configured gateway and wallet
//! providers into a delegation orchestrator and runs one command. Failures of
//! a delegation attempt are printed as their user message and reflected in
//! the exit code.

use clap::{Parser, Subcommand};
use delegator_config::Config;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod factory_registry;

use factory_registry::build_orchestrator;

/// Command-line arguments for the delegation tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "DELEGATOR_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
	/// List installed wallet providers in picker order
	Providers,
	/// List the configured pool and DRep targets; defaults are starred
	Targets,
	/// Fetch and print the current protocol parameters
	Params,
	/// Build the unsigned delegation transaction without signing it
	Build {
		#[command(subcommand)]
		target: TargetArg,
		/// Wallet provider to use instead of the remembered one
		#[arg(short, long, global = true)]
		wallet: Option<String>,
	},
	/// Build, sign and submit a delegation
	Delegate {
		#[command(subcommand)]
		target: TargetArg,
		/// Wallet provider to use instead of the remembered one
		#[arg(short, long, global = true)]
		wallet: Option<String>,
	},
}

/// Delegation target given on the command line.
///
/// Without an id the first matching entry of `[targets]` is used.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum TargetArg {
	/// Delegate stake to a pool (pool1...)
	Pool { id: Option<String> },
	/// Delegate voting power to a DRep (drep1...)
	Drep { id: Option<String> },
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	match run(args).await {
		Ok(code) => code,
		Err(e) => {
			eprintln!("Error: {}", e);
			ExitCode::FAILURE
		},
	}
}

/// Startup errors (configuration, wiring) come back as `Err`; delegation
/// failures are already reported and only pick the exit code.
async fn run(args: Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
	let config_path = args
		.config
		.to_str()
		.ok_or("configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!(id = %config.delegator.id, network = %config.delegator.network, "Loaded configuration");

	let targets = config.targets.clone();
	let orchestrator = build_orchestrator(config)?;

	match args.command {
		Command::Providers => commands::providers(&orchestrator),
		Command::Targets => commands::targets(&targets),
		Command::Params => commands::params(&orchestrator).await,
		Command::Build { target, wallet } => {
			commands::build(&orchestrator, &targets, &target, wallet.as_deref()).await
		},
		Command::Delegate { target, wallet } => {
			commands::delegate(&orchestrator, &targets, &target, wallet.as_deref()).await
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parses_delegate_with_wallet() {
		let args = Args::try_parse_from([
			"delegator",
			"--config",
			"custom.toml",
			"delegate",
			"drep",
			"drep1abc",
			"--wallet",
			"lace",
		])
		.unwrap();
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(
			args.command,
			Command::Delegate {
				target: TargetArg::Drep {
					id: Some("drep1abc".into())
				},
				wallet: Some("lace".into()),
			}
		);
	}

	#[test]
	fn test_build_requires_a_target() {
		assert!(Args::try_parse_from(["delegator", "build"]).is_err());
		let args = Args::try_parse_from(["delegator", "build", "pool", "pool1xyz"]).unwrap();
		assert!(matches!(
			args.command,
			Command::Build {
				target: TargetArg::Pool { id: Some(_) },
				wallet: None
			}
		));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_target_id_is_optional() {
		let args = Args::try_parse_from(["delegator", "delegate", "drep"]).unwrap();
		assert_eq!(
			args.command,
			Command::Delegate {
				target: TargetArg::Drep { id: None },
				wallet: None,
			}
		);
		let args = Args::try_parse_from(["delegator", "targets"]).unwrap();
		assert_eq!(args.command, Command::Targets);
	}
}
