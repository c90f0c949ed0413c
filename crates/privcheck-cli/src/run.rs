//! # Run Subcommand
//!
//! Loads a run configuration, runs the pipeline on a bounded worker pool
//! and writes the artifacts.
//!
//! ```bash
//! privcheck run --config study/run.yaml
//! privcheck run --config study/run.yaml --output-dir /tmp/out --workers 2
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::RunConfig;
use crate::pipeline::{execute, output_dir, prepare};

/// Arguments for the run subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run configuration file.
    #[arg(long)]
    pub config: PathBuf,

    /// Write artifacts here instead of the configured `output_dir`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Worker threads; overrides the configured `workers`.
    #[arg(long)]
    pub workers: Option<usize>,
}

/// Execute the run subcommand.
pub fn run_pipeline(args: &RunArgs) -> Result<u8> {
    let mut config = RunConfig::load(&args.config)
        .with_context(|| format!("loading run configuration {}", args.config.display()))?;
    if args.workers.is_some() {
        config.workers = args.workers;
    }
    let out_dir = output_dir(&config, args.output_dir.as_deref());
    let prepared = prepare(config).context("preparing run")?;

    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(n) = prepared.config.workers()? {
        pool = pool.num_threads(n);
    }
    let pool = pool.build().context("failed to start worker pool")?;
    tracing::info!(workers = pool.current_num_threads(), "starting pipeline");

    let output = pool.install(|| execute(&prepared))?;
    let manifest = output
        .write(&out_dir)
        .with_context(|| format!("writing artifacts to {}", out_dir.display()))?;

    println!(
        "OK: evaluated {} domains as of {}",
        output.evaluation.scores.len(),
        output.as_of
    );
    println!("  verdicts:        {}", output.evaluation.verdicts.len());
    println!(
        "  scored:          {} (excluded {})",
        output.metrics.global.scored, output.metrics.global.excluded
    );
    println!("  ledger entries:  {}", output.ledger.len());
    for entry in manifest.artifacts.values() {
        println!("  wrote: {} ({})", out_dir.join(&entry.file).display(), entry.digest);
    }
    Ok(0)
}
