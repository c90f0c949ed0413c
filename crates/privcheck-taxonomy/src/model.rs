//! # Taxonomy Model
//!
//! [`TrackerEntry`] is one row of the reference taxonomy. [`Taxonomy`] owns
//! the entries in insertion order together with an index from pattern to
//! entry positions, built once at construction.

use std::collections::HashMap;

use privcheck_core::{CountryCode, HostName};
use serde::{Deserialize, Serialize};

use crate::error::{TaxonomyError, TaxonomyResult};

/// Priority assigned to entries that do not declare one.
pub const DEFAULT_PRIORITY: u32 = 100;

/// Tracker purpose category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerCategory {
    /// Ad serving, retargeting, ad measurement.
    Advertising,
    /// Audience measurement and site analytics.
    Analytics,
    /// Social network widgets and pixels.
    Social,
    /// Functionally required third parties (CDNs, consent platforms, SSO).
    Essential,
    /// Everything else, including hosts the taxonomy does not know.
    Other,
}

impl TrackerCategory {
    /// All categories in declaration order.
    pub const ALL: [TrackerCategory; 5] = [
        Self::Advertising,
        Self::Analytics,
        Self::Social,
        Self::Essential,
        Self::Other,
    ];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advertising => "advertising",
            Self::Analytics => "analytics",
            Self::Social => "social",
            Self::Essential => "essential",
            Self::Other => "other",
        }
    }

    /// Parse a category label as written by common tracker datasets.
    ///
    /// Accepts the canonical names and labels such as `Ad Motivated
    /// Tracking`, `Audience Measurement`, `Social Network`, `CDN`.
    /// Returns `None` for labels that match nothing.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let norm: String = raw
            .trim()
            .to_lowercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let exact = match norm.as_str() {
            "advertising" | "ad" | "ads" | "advertisement" | "ad motivated tracking"
            | "ad fraud" | "action pixels" | "marketing" => Some(Self::Advertising),
            "analytics" | "audience measurement" | "site analytics" | "session replay"
            | "third party analytics marketing" | "statistics" => Some(Self::Analytics),
            "social" | "social network" | "social share" | "social comment"
            | "social media" => Some(Self::Social),
            "essential" | "cdn" | "content delivery" | "tag manager"
            | "consent management platform" | "federated login" | "sso"
            | "online payment" | "non tracking" | "hosting" => Some(Self::Essential),
            "other" | "unknown" | "misc" | "miscellaneous" | "embedded content" => {
                Some(Self::Other)
            }
            _ => None,
        };
        exact.or_else(|| {
            if norm.contains("advert") || norm.starts_with("ad ") {
                Some(Self::Advertising)
            } else if norm.contains("analytic") {
                Some(Self::Analytics)
            } else if norm.contains("social") {
                Some(Self::Social)
            } else {
                None
            }
        })
    }
}

impl std::fmt::Display for TrackerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One taxonomy row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerEntry {
    /// Host or domain suffix this entry matches.
    pub match_pattern: HostName,
    /// Organization operating the tracker.
    pub owner_name: String,
    /// Purpose category.
    pub category: TrackerCategory,
    /// Tie-break rank; lower wins.
    pub priority: u32,
    /// Country of the owning organization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_country: Option<CountryCode>,
    /// Share of sites on which the tracker appears (0..=1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prevalence: Option<f64>,
    /// Fingerprinting likelihood score (0..=3).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprinting: Option<u8>,
}

impl TrackerEntry {
    /// Entry with default priority and no optional metadata.
    pub fn new(match_pattern: HostName, owner_name: impl Into<String>, category: TrackerCategory) -> Self {
        Self {
            match_pattern,
            owner_name: owner_name.into(),
            category,
            priority: DEFAULT_PRIORITY,
            owner_country: None,
            prevalence: None,
            fingerprinting: None,
        }
    }

    /// Set the tie-break priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the owner's country.
    pub fn with_owner_country(mut self, country: CountryCode) -> Self {
        self.owner_country = Some(country);
        self
    }
}

/// The loaded tracker taxonomy.
///
/// Immutable after construction; shared across worker threads behind an
/// `Arc`.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    version: Option<String>,
    entries: Vec<TrackerEntry>,
    pattern_index: HashMap<String, Vec<usize>>,
}

impl Taxonomy {
    /// Build a taxonomy from entries in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::Empty`] when `entries` is empty.
    pub fn new(entries: Vec<TrackerEntry>) -> TaxonomyResult<Self> {
        if entries.is_empty() {
            return Err(TaxonomyError::Empty {
                origin: "<entries>".to_string(),
            });
        }
        let mut pattern_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            pattern_index
                .entry(entry.match_pattern.as_str().to_string())
                .or_default()
                .push(idx);
        }
        Ok(Self {
            version: None,
            entries,
            pattern_index,
        })
    }

    /// Attach the taxonomy's declared version.
    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    /// Declared version, if the document carried one.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[TrackerEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed taxonomy.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The best entry whose pattern equals `key` exactly: lowest priority,
    /// then earliest insertion.
    pub(crate) fn best_for_pattern(&self, key: &str) -> Option<&TrackerEntry> {
        let indices = self.pattern_index.get(key)?;
        indices
            .iter()
            .min_by_key(|&&idx| (self.entries[idx].priority, idx))
            .map(|&idx| &self.entries[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(s: &str) -> HostName {
        HostName::parse(s).unwrap()
    }

    #[test]
    fn lenient_category_labels() {
        use TrackerCategory::*;
        assert_eq!(TrackerCategory::parse_lenient("Advertising"), Some(Advertising));
        assert_eq!(TrackerCategory::parse_lenient("Ad Motivated Tracking"), Some(Advertising));
        assert_eq!(TrackerCategory::parse_lenient("audience_measurement"), Some(Analytics));
        assert_eq!(TrackerCategory::parse_lenient("Social Network"), Some(Social));
        assert_eq!(TrackerCategory::parse_lenient("CDN"), Some(Essential));
        assert_eq!(TrackerCategory::parse_lenient("Web Analytics Suite"), Some(Analytics));
        assert_eq!(TrackerCategory::parse_lenient("Unknown"), Some(Other));
        assert_eq!(TrackerCategory::parse_lenient("quantum widgets"), None);
    }

    #[test]
    fn category_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TrackerCategory::Advertising).unwrap(),
            "\"advertising\""
        );
    }

    #[test]
    fn empty_taxonomy_is_rejected() {
        assert!(matches!(Taxonomy::new(vec![]), Err(TaxonomyError::Empty { .. })));
    }

    #[test]
    fn duplicate_patterns_pick_lowest_priority_then_first() {
        let t = Taxonomy::new(vec![
            TrackerEntry::new(host("t.com"), "Late", TrackerCategory::Other).with_priority(5),
            TrackerEntry::new(host("t.com"), "Low", TrackerCategory::Analytics).with_priority(1),
            TrackerEntry::new(host("t.com"), "LowLater", TrackerCategory::Social).with_priority(1),
        ])
        .unwrap();
        assert_eq!(t.best_for_pattern("t.com").unwrap().owner_name, "Low");
    }
}
