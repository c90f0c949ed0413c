//! # Rules Subcommand
//!
//! Lists the built-in compliance rules in evaluation order.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use privcheck_compliance::RuleRegistry;

/// Arguments for the rules subcommand.
#[derive(Args, Debug)]
pub struct RulesArgs {
    /// Print the registry as JSON.
    #[arg(long)]
    pub json: bool,
}

/// One rule as listed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleListing {
    pub id: &'static str,
    pub description: &'static str,
    pub claim_field: &'static str,
    pub fact_field: &'static str,
}

/// The built-in registry as listings.
pub fn listings() -> Vec<RuleListing> {
    RuleRegistry::builtin()
        .iter()
        .map(|rule| RuleListing {
            id: rule.id,
            description: rule.description,
            claim_field: rule.claim_field,
            fact_field: rule.fact_field,
        })
        .collect()
}

/// Execute the rules subcommand.
pub fn run_rules(args: &RulesArgs) -> Result<u8> {
    let rules = listings();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rules).context("failed to serialize rule registry")?
        );
        return Ok(0);
    }
    println!("Built-in compliance rules:");
    println!();
    for rule in &rules {
        println!("  {:<26} {}", rule.id, rule.description);
        println!("  {:<26} claim: {}  fact: {}", "", rule.claim_field, rule.fact_field);
    }
    println!();
    println!("Total: {} rules", rules.len());
    Ok(0)
}
