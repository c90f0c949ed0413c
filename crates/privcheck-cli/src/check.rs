//! # Check Subcommand
//!
//! Loads a run configuration and everything it references (taxonomy,
//! rule selection, domain lists, country overrides) without reading any
//! measurement data. Configured input files are checked for existence.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::RunConfig;
use crate::pipeline::prepare;

/// Arguments for the check subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Run configuration file.
    #[arg(long)]
    pub config: PathBuf,
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let config = RunConfig::load(&args.config)
        .with_context(|| format!("loading run configuration {}", args.config.display()))?;
    let prepared = prepare(config).context("validating run configuration")?;

    println!("OK: {}", args.config.display());
    println!("  as_of:            {}", prepared.as_of);
    println!(
        "  taxonomy:         {} trackers (version {})",
        prepared.taxonomy.len(),
        prepared.taxonomy.version().unwrap_or("-")
    );
    println!("  rules:            {}", prepared.registry.ids().join(", "));
    println!("  official domains: {}", prepared.official.len());

    let inputs = &prepared.config.inputs;
    let mut missing = 0;
    for (name, path) in [
        ("cookies", &inputs.cookies),
        ("requests", &inputs.requests),
        ("headers", &inputs.headers),
        ("tls", &inputs.tls),
        ("fingerprinting", &inputs.fingerprinting),
        ("policies", &inputs.policies),
    ] {
        match path.as_deref() {
            None => println!("  input {name:<15} not configured"),
            Some(p) if p.is_file() => println!("  input {name:<15} {}", p.display()),
            Some(p) => {
                eprintln!("  input {name:<15} MISSING: {}", p.display());
                missing += 1;
            }
        }
    }

    if missing > 0 {
        eprintln!("FAIL: {missing} configured input(s) not found");
        return Ok(crate::EXIT_OPERATIONAL);
    }
    Ok(0)
}
