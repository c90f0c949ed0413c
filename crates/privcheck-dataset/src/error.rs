//! Dataset error types.
//!
//! Only input-level failures are errors here. Anything wrong with a single
//! line or a single domain goes to the [`ErrorLedger`](crate::ErrorLedger)
//! instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading measurement sources.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A configured source file does not exist.
    #[error("input file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// A configured source file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;
