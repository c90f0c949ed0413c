//! # Country Assignment
//!
//! A domain's country comes from, in order:
//!
//! 1. an explicit mapping (the official domain lists, then per-domain
//!    overrides from the run configuration);
//! 2. the country-code TLD of its public suffix (`gob.es` → `ES`,
//!    `gov.uk` → `GB`, bare `gov`/`mil` → `US`);
//! 3. nothing, in which case metrics file it under [`UNASSIGNED`].

use std::collections::BTreeMap;

use privcheck_compliance::CountryLookup;
use privcheck_core::{CountryCode, HostName};

/// Metrics group for domains without a country.
pub const UNASSIGNED: &str = "unassigned";

/// Explicit mapping with public-suffix fallback.
#[derive(Debug, Clone, Default)]
pub struct CountryResolver {
    explicit: BTreeMap<HostName, CountryCode>,
}

impl CountryResolver {
    /// A resolver with no explicit mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map one domain explicitly. A later mapping replaces an earlier one.
    pub fn assign(&mut self, domain: HostName, country: CountryCode) {
        self.explicit.insert(domain, country);
    }

    /// Number of explicit mappings.
    pub fn explicit_len(&self) -> usize {
        self.explicit.len()
    }

    /// Metrics group key: the country code or [`UNASSIGNED`].
    pub fn group_of(&self, domain: &HostName) -> String {
        self.country_of(domain)
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| UNASSIGNED.to_string())
    }
}

impl CountryLookup for CountryResolver {
    fn country_of(&self, domain: &HostName) -> Option<CountryCode> {
        if let Some(country) = self.explicit.get(domain) {
            return Some(country.clone());
        }
        domain.public_suffix().and_then(CountryCode::from_public_suffix)
    }
}

impl Extend<(HostName, CountryCode)> for CountryResolver {
    fn extend<I: IntoIterator<Item = (HostName, CountryCode)>>(&mut self, iter: I) {
        self.explicit.extend(iter);
    }
}
