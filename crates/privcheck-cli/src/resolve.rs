//! # Resolve Subcommand
//!
//! Resolves hosts against a tracker taxonomy and prints the resolutions
//! as a JSON array, one entry per host in argument order.
//!
//! ```bash
//! privcheck resolve --taxonomy taxonomy.yaml www.google-analytics.com cdn.example.org
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use privcheck_core::HostName;
use privcheck_taxonomy::{load_taxonomy, Resolution, Resolver};

use crate::config::ConfigError;

/// Arguments for the resolve subcommand.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Tracker taxonomy file (YAML or JSON).
    #[arg(long)]
    pub taxonomy: PathBuf,

    /// Hosts or URLs to resolve.
    #[arg(required = true)]
    pub hosts: Vec<String>,
}

/// Execute the resolve subcommand.
pub fn run_resolve(args: &ResolveArgs) -> Result<u8> {
    let taxonomy = load_taxonomy(&args.taxonomy)
        .map_err(ConfigError::from)
        .with_context(|| format!("loading taxonomy {}", args.taxonomy.display()))?;
    let resolver = Resolver::new(Arc::new(taxonomy));

    let (resolutions, failed) = resolve_all(&resolver, &args.hosts);
    println!(
        "{}",
        serde_json::to_string_pretty(&resolutions).context("failed to serialize resolutions")?
    );
    if failed > 0 {
        return Ok(crate::EXIT_OPERATIONAL);
    }
    Ok(0)
}

/// Resolve every parseable host; unparseable ones are reported on stderr
/// and counted.
pub fn resolve_all(resolver: &Resolver, hosts: &[String]) -> (Vec<Resolution>, usize) {
    let mut failed = 0;
    let resolutions = hosts
        .iter()
        .filter_map(|raw| match HostName::parse(raw) {
            Ok(host) => Some(resolver.resolve(&host)),
            Err(e) => {
                eprintln!("ERROR: {raw}: {e}");
                failed += 1;
                None
            }
        })
        .collect();
    (resolutions, failed)
}
