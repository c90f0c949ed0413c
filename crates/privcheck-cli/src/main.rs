//! # privcheck CLI entry point
//!
//! Parses command-line arguments, installs logging and dispatches to the
//! subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use privcheck_cli::check::{run_check, CheckArgs};
use privcheck_cli::resolve::{run_resolve, ResolveArgs};
use privcheck_cli::rules::{run_rules, RulesArgs};
use privcheck_cli::run::{run_pipeline, RunArgs};

/// privcheck: privacy compliance auditing for government websites.
///
/// Joins crawler measurements with declared policy claims, evaluates
/// compliance rules per domain and aggregates metrics per country.
#[derive(Parser, Debug)]
#[command(name = "privcheck", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline and write every artifact.
    Run(RunArgs),

    /// Validate a run configuration without processing any data.
    Check(CheckArgs),

    /// Resolve hosts against a tracker taxonomy.
    Resolve(ResolveArgs),

    /// List the built-in compliance rules.
    Rules(RulesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "privcheck starting");

    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args),
        Commands::Check(args) => run_check(args),
        Commands::Resolve(args) => run_resolve(args),
        Commands::Rules(args) => run_rules(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("ERROR: {e:#}");
            ExitCode::from(privcheck_cli::exit_code_for(&e))
        }
    }
}
