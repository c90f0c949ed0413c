//! # Run Configuration
//!
//! A run is described by one YAML file:
//!
//! ```yaml
//! as_of: "2025-03-01T00:00:00Z"
//! taxonomy: taxonomy.yaml
//! inputs:
//!   cookies: data/cookies.jsonl
//!   requests: data/requests.jsonl
//!   headers: data/headers.jsonl
//!   tls: data/tls.jsonl
//!   fingerprinting: data/fingerprinting.jsonl
//!   policies: data/policies.jsonl
//! official_domains:
//!   ES: lists/es.txt
//!   GB: lists/gb.txt
//! country_overrides:
//!   example.org: ES
//! rules: [third_party_sharing, undeclared_cookie_use]
//! workers: 4
//! output_dir: out
//! ```
//!
//! Relative paths resolve against the directory holding the config file.
//! Every input is optional; an omitted input is a source that did not
//! cover any domain.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use privcheck_compliance::RegistryError;
use privcheck_core::{Timestamp, ValidationError};
use privcheck_taxonomy::TaxonomyError;

/// Configuration problems. All are fatal before any domain is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid as_of {value:?}: {source}")]
    InvalidAsOf {
        value: String,
        source: ValidationError,
    },

    #[error("invalid country code {value:?} in {context}: {source}")]
    InvalidCountry {
        value: String,
        context: String,
        source: ValidationError,
    },

    #[error("invalid domain {value:?} in {context}: {source}")]
    InvalidDomain {
        value: String,
        context: String,
        source: ValidationError,
    },

    #[error("domain list not found: {path}")]
    DomainListNotFound { path: PathBuf },

    #[error("workers must be at least 1")]
    ZeroWorkers,

    #[error("taxonomy: {0}")]
    Taxonomy(#[from] TaxonomyError),

    #[error("rules: {0}")]
    Rules(#[from] RegistryError),
}

/// Measurement and claim inputs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputPaths {
    pub cookies: Option<PathBuf>,
    pub requests: Option<PathBuf>,
    pub headers: Option<PathBuf>,
    pub tls: Option<PathBuf>,
    pub fingerprinting: Option<PathBuf>,
    pub policies: Option<PathBuf>,
}

/// A parsed run configuration with paths resolved.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Reference instant for every relative time (RFC 3339).
    pub as_of: String,
    /// Tracker taxonomy file.
    pub taxonomy: PathBuf,
    #[serde(default)]
    pub inputs: InputPaths,
    /// Country code to domain list file.
    #[serde(default)]
    pub official_domains: BTreeMap<String, PathBuf>,
    /// Domain to country code, applied after the lists.
    #[serde(default)]
    pub country_overrides: BTreeMap<String, String>,
    /// Rule ids to evaluate; all built-in rules when absent.
    #[serde(default)]
    pub rules: Option<Vec<String>>,
    /// Worker threads; available cores when absent.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

impl RunConfig {
    /// Read and parse a config file, resolving relative paths against its
    /// directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        let base = path.parent().unwrap_or(Path::new("."));
        let config = Self::parse(&content, path)?.resolved_against(base);
        tracing::debug!(path = %path.display(), "loaded run configuration");
        Ok(config)
    }

    /// Parse config text without touching the filesystem.
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            source: e,
        })
    }

    /// The reference instant.
    pub fn as_of(&self) -> Result<Timestamp, ConfigError> {
        Timestamp::parse(&self.as_of).map_err(|e| ConfigError::InvalidAsOf {
            value: self.as_of.clone(),
            source: e,
        })
    }

    /// Worker count, rejecting zero.
    pub fn workers(&self) -> Result<Option<usize>, ConfigError> {
        match self.workers {
            Some(0) => Err(ConfigError::ZeroWorkers),
            other => Ok(other),
        }
    }

    fn resolved_against(mut self, base: &Path) -> Self {
        let fix = |p: &mut PathBuf| *p = crate::resolve_path(p, base);
        fix(&mut self.taxonomy);
        fix(&mut self.output_dir);
        for p in [
            &mut self.inputs.cookies,
            &mut self.inputs.requests,
            &mut self.inputs.headers,
            &mut self.inputs.tls,
            &mut self.inputs.fingerprinting,
            &mut self.inputs.policies,
        ]
        .into_iter()
        .flatten()
        {
            fix(p);
        }
        for p in self.official_domains.values_mut() {
            fix(p);
        }
        self
    }
}
