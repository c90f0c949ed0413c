//! Taxonomy error types.
//!
//! Every taxonomy error is a configuration error: the run cannot resolve
//! any host without a valid taxonomy, so loading fails before any
//! per-domain processing starts.

use std::path::PathBuf;

use privcheck_core::ValidationError;
use thiserror::Error;

/// Errors raised while loading or building a tracker taxonomy.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    /// The taxonomy file does not exist.
    #[error("taxonomy file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The taxonomy file exists but could not be read.
    #[error("failed to read taxonomy {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document is not valid YAML/JSON or lacks the `trackers` mapping.
    #[error("failed to parse taxonomy {origin}: {source}")]
    Parse {
        origin: String,
        source: serde_yaml::Error,
    },

    /// A pattern key is not a valid host or domain suffix.
    #[error("invalid tracker pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: ValidationError,
    },

    /// A tracker entry has a malformed field.
    #[error("invalid tracker entry {pattern:?}: {reason}")]
    InvalidEntry { pattern: String, reason: String },

    /// The taxonomy has no entries.
    #[error("taxonomy {origin} contains no tracker entries")]
    Empty { origin: String },
}

/// Result type alias for taxonomy operations.
pub type TaxonomyResult<T> = Result<T, TaxonomyError>;
