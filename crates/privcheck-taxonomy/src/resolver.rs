//! # Tracker Resolver
//!
//! Maps an observed host to the best taxonomy entry.
//!
//! ## Algorithm
//!
//! 1. The host is already normalized by [`HostName`].
//! 2. Candidates are the host itself followed by each parent domain up to
//!    and including the registrable domain ([`HostName::suffix_chain`]).
//!    The walk never reaches the public suffix, so a pattern such as
//!    `gov.uk` can never claim every UK government site.
//! 3. The first candidate with any entry wins (longest suffix is most
//!    specific). An entry on the host itself is an exact match.
//! 4. Among entries sharing that pattern, the lowest `priority` wins, then
//!    the earliest in taxonomy order.
//!
//! Resolution is a pure function of (host, taxonomy).

use std::sync::Arc;

use privcheck_core::{CountryCode, HostName};
use serde::Serialize;

use crate::model::{Taxonomy, TrackerCategory, TrackerEntry};

/// How a host matched its taxonomy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The pattern equals the host.
    Exact,
    /// The pattern is a parent domain of the host.
    Suffix,
}

/// Outcome of resolving one host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// The resolved host.
    pub host: HostName,
    /// Owner of the matched tracker; `None` when unmatched.
    pub owner_name: Option<String>,
    /// Category of the matched tracker; `other` when unmatched.
    pub category: TrackerCategory,
    /// Country of the matched tracker's owner.
    pub owner_country: Option<CountryCode>,
    /// The pattern that matched.
    pub matched_pattern: Option<HostName>,
    /// Exact or suffix match.
    pub match_kind: Option<MatchKind>,
}

impl Resolution {
    fn unmatched(host: &HostName) -> Self {
        Self {
            host: host.clone(),
            owner_name: None,
            category: TrackerCategory::Other,
            owner_country: None,
            matched_pattern: None,
            match_kind: None,
        }
    }

    fn matched(host: &HostName, entry: &TrackerEntry, kind: MatchKind) -> Self {
        Self {
            host: host.clone(),
            owner_name: Some(entry.owner_name.clone()),
            category: entry.category,
            owner_country: entry.owner_country.clone(),
            matched_pattern: Some(entry.match_pattern.clone()),
            match_kind: Some(kind),
        }
    }

    /// Whether the host resolved to a taxonomy entry.
    pub fn is_match(&self) -> bool {
        self.match_kind.is_some()
    }
}

/// Shared, read-only resolver over a loaded taxonomy.
///
/// Cloning is cheap; all clones share one taxonomy.
#[derive(Debug, Clone)]
pub struct Resolver {
    taxonomy: Arc<Taxonomy>,
}

impl Resolver {
    /// Wrap a shared taxonomy.
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self { taxonomy }
    }

    /// The underlying taxonomy.
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Find the best entry for `host` and how it matched.
    pub fn lookup(&self, host: &HostName) -> Option<(&TrackerEntry, MatchKind)> {
        host.suffix_chain()
            .into_iter()
            .enumerate()
            .find_map(|(depth, candidate)| {
                self.taxonomy.best_for_pattern(candidate).map(|entry| {
                    let kind = if depth == 0 {
                        MatchKind::Exact
                    } else {
                        MatchKind::Suffix
                    };
                    (entry, kind)
                })
            })
    }

    /// Resolve `host` into a [`Resolution`].
    pub fn resolve(&self, host: &HostName) -> Resolution {
        match self.lookup(host) {
            Some((entry, kind)) => {
                tracing::trace!(host = %host, pattern = %entry.match_pattern, "tracker match");
                Resolution::matched(host, entry, kind)
            }
            None => Resolution::unmatched(host),
        }
    }
}
