//! # Error Hierarchy
//!
//! Structured error types shared by every privcheck crate, built with
//! `thiserror`. Each variant carries the offending input so that an operator
//! can act on the message without re-running the pipeline.

use thiserror::Error;

/// Top-level error type for the foundational layer.
#[derive(Error, Debug)]
pub enum PrivcheckError {
    /// Canonicalization failure during digest computation.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for domain primitive newtypes.
///
/// These errors carry the invalid input and the expected format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A host name could not be parsed into a valid DNS name or IP literal.
    #[error("invalid host \"{input}\": {reason}")]
    InvalidHost {
        /// The raw input as received.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Country code is not a two-letter ISO 3166-1 alpha-2 code.
    #[error("invalid country code: \"{0}\" (expected two ASCII letters)")]
    InvalidCountryCode(String),

    /// Timestamp string is neither RFC 3339 nor a Unix epoch in seconds.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
