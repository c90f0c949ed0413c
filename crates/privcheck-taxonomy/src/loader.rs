//! # Taxonomy Loader
//!
//! Reads the taxonomy document:
//!
//! ```yaml
//! version: "2025-01"
//! trackers:
//!   doubleclick.net:
//!     owner: Google LLC
//!     category: Advertising
//!     priority: 10
//!     owner_country: US
//!     prevalence: 0.42
//!     fingerprinting: 1
//! ```
//!
//! JSON documents are read through the same YAML parser, so mapping order
//! (the taxonomy's insertion order) is preserved for both formats.

use std::path::Path;

use privcheck_core::{CountryCode, HostName};
use serde::Deserialize;

use crate::error::{TaxonomyError, TaxonomyResult};
use crate::model::{Taxonomy, TrackerCategory, TrackerEntry, DEFAULT_PRIORITY};

#[derive(Debug, Deserialize)]
struct RawTaxonomy {
    #[serde(default)]
    version: Option<serde_yaml::Value>,
    trackers: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    owner: String,
    category: String,
    #[serde(default)]
    priority: Option<u32>,
    #[serde(default)]
    owner_country: Option<String>,
    #[serde(default)]
    prevalence: Option<f64>,
    #[serde(default)]
    fingerprinting: Option<u8>,
}

/// Load a taxonomy from a YAML or JSON file.
pub fn load_taxonomy(path: &Path) -> TaxonomyResult<Taxonomy> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TaxonomyError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            TaxonomyError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let taxonomy = parse_taxonomy(&content, &path.display().to_string())?;
    tracing::info!(
        path = %path.display(),
        entries = taxonomy.len(),
        version = taxonomy.version().unwrap_or("-"),
        "loaded tracker taxonomy"
    );
    Ok(taxonomy)
}

/// Parse a taxonomy document. `origin` names the source in error messages.
pub fn parse_taxonomy(content: &str, origin: &str) -> TaxonomyResult<Taxonomy> {
    let raw: RawTaxonomy = serde_yaml::from_str(content).map_err(|e| TaxonomyError::Parse {
        origin: origin.to_string(),
        source: e,
    })?;

    if raw.trackers.is_empty() {
        return Err(TaxonomyError::Empty {
            origin: origin.to_string(),
        });
    }

    let mut entries = Vec::with_capacity(raw.trackers.len());
    for (key, value) in raw.trackers {
        let pattern = match key {
            serde_yaml::Value::String(s) => s,
            other => {
                return Err(TaxonomyError::InvalidEntry {
                    pattern: format!("{other:?}"),
                    reason: "pattern key must be a string".to_string(),
                })
            }
        };
        entries.push(build_entry(&pattern, value)?);
    }

    let version = raw.version.and_then(|v| match v {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    Ok(Taxonomy::new(entries)?.with_version(version))
}

fn build_entry(pattern: &str, value: serde_yaml::Value) -> TaxonomyResult<TrackerEntry> {
    let invalid = |reason: String| TaxonomyError::InvalidEntry {
        pattern: pattern.to_string(),
        reason,
    };

    let match_pattern = HostName::parse(pattern).map_err(|source| TaxonomyError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    let raw: RawEntry = serde_yaml::from_value(value).map_err(|e| invalid(e.to_string()))?;

    let category = TrackerCategory::parse_lenient(&raw.category).unwrap_or_else(|| {
        tracing::warn!(
            pattern,
            category = %raw.category,
            "unrecognized tracker category, using other"
        );
        TrackerCategory::Other
    });

    let owner_country = raw
        .owner_country
        .as_deref()
        .map(CountryCode::new)
        .transpose()
        .map_err(|e| invalid(e.to_string()))?;

    if let Some(p) = raw.prevalence {
        if !(0.0..=1.0).contains(&p) {
            return Err(invalid(format!("prevalence {p} outside 0..=1")));
        }
    }
    if let Some(f) = raw.fingerprinting {
        if f > 3 {
            return Err(invalid(format!("fingerprinting score {f} outside 0..=3")));
        }
    }
    if raw.owner.trim().is_empty() {
        return Err(invalid("owner is empty".to_string()));
    }

    Ok(TrackerEntry {
        match_pattern,
        owner_name: raw.owner.trim().to_string(),
        category,
        priority: raw.priority.unwrap_or(DEFAULT_PRIORITY),
        owner_country,
        prevalence: raw.prevalence,
        fingerprinting: raw.fingerprinting,
    })
}
