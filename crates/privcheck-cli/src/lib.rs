//! # privcheck-cli: Command-Line Interface
//!
//! Provides the `privcheck` binary. Argument parsing lives in `main.rs`;
//! the handlers here load configuration and delegate to the library
//! crates.
//!
//! ## Subcommands
//!
//! - `privcheck run`: Run the full pipeline and write every artifact.
//! - `privcheck check`: Validate a run configuration without processing.
//! - `privcheck resolve`: Resolve hosts against a tracker taxonomy.
//! - `privcheck rules`: List the built-in compliance rules.
//!
//! ```bash
//! privcheck -v run --config study/run.yaml
//! privcheck check --config study/run.yaml
//! privcheck resolve --taxonomy taxonomy.yaml www.google-analytics.com
//! ```
//!
//! ## Exit Codes
//!
//! `0` on success, [`EXIT_CONFIG`] when the configuration, taxonomy,
//! domain lists or rule selection are unusable, [`EXIT_OPERATIONAL`] for
//! any other failure (unreadable input, unwritable output).

pub mod check;
pub mod config;
pub mod domains;
pub mod output;
pub mod pipeline;
pub mod resolve;
pub mod rules;
pub mod run;

use std::path::{Path, PathBuf};

/// Configuration error exit code.
pub const EXIT_CONFIG: u8 = 1;

/// Operational error exit code.
pub const EXIT_OPERATIONAL: u8 = 2;

/// Resolve a path that may be relative to `base`.
///
/// Absolute paths are returned as-is; relative paths are joined onto
/// `base` whether or not the target exists yet.
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Exit code for a failed handler: configuration problems anywhere in the
/// error chain map to [`EXIT_CONFIG`].
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    let is_config = err
        .chain()
        .any(|cause| cause.downcast_ref::<config::ConfigError>().is_some());
    if is_config {
        EXIT_CONFIG
    } else {
        EXIT_OPERATIONAL
    }
}
