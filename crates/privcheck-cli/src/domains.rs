//! # Official Domain Lists
//!
//! One plain-text file per country, one host (or URL) per line. Blank
//! lines and `#` comments are ignored, including trailing comments. The
//! lists pad the dataset with domains nobody measured and pin each listed
//! domain to its country.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use privcheck_core::{CountryCode, HostName};
use privcheck_metrics::CountryResolver;

use crate::config::ConfigError;

/// Every listed domain with its country.
#[derive(Debug, Clone, Default)]
pub struct OfficialDomains {
    by_country: BTreeMap<CountryCode, BTreeSet<HostName>>,
}

impl OfficialDomains {
    /// Load every list in `lists` (country code → file).
    pub fn load(lists: &BTreeMap<String, PathBuf>) -> Result<Self, ConfigError> {
        let mut by_country: BTreeMap<CountryCode, BTreeSet<HostName>> = BTreeMap::new();
        for (raw_country, path) in lists {
            let country = CountryCode::new(raw_country).map_err(|e| ConfigError::InvalidCountry {
                value: raw_country.clone(),
                context: "official_domains".to_string(),
                source: e,
            })?;
            let domains = load_domain_list(path)?;
            tracing::info!(
                country = %country.as_str(),
                path = %path.display(),
                domains = domains.len(),
                "loaded official domain list"
            );
            by_country.entry(country).or_default().extend(domains);
        }
        Ok(Self { by_country })
    }

    /// Every listed domain, deduplicated, in order.
    pub fn domains(&self) -> BTreeSet<HostName> {
        self.by_country.values().flatten().cloned().collect()
    }

    /// Number of distinct listed domains.
    pub fn len(&self) -> usize {
        self.domains().len()
    }

    /// Whether no domain is listed.
    pub fn is_empty(&self) -> bool {
        self.by_country.values().all(BTreeSet::is_empty)
    }

    /// Pin every listed domain to its country. A domain on several lists
    /// keeps the first country in code order.
    pub fn assign_countries(&self, resolver: &mut CountryResolver) {
        let mut assigned: BTreeMap<&HostName, &CountryCode> = BTreeMap::new();
        for (country, domains) in &self.by_country {
            for domain in domains {
                if let Some(first) = assigned.get(domain) {
                    if *first != country {
                        tracing::warn!(
                            domain = %domain,
                            kept = %first.as_str(),
                            ignored = %country.as_str(),
                            "domain listed for more than one country"
                        );
                    }
                    continue;
                }
                assigned.insert(domain, country);
            }
        }
        resolver.extend(assigned.into_iter().map(|(d, c)| (d.clone(), c.clone())));
    }
}

/// Read one domain list.
pub fn load_domain_list(path: &Path) -> Result<BTreeSet<HostName>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::DomainListNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    parse_domain_list(&content, &path.display().to_string())
}

/// Parse domain list text. `origin` names the list in errors.
pub fn parse_domain_list(content: &str, origin: &str) -> Result<BTreeSet<HostName>, ConfigError> {
    let mut out = BTreeSet::new();
    for (idx, line) in content.lines().enumerate() {
        let entry = line.split('#').next().unwrap_or("").trim();
        if entry.is_empty() {
            continue;
        }
        let host = HostName::parse(entry).map_err(|e| ConfigError::InvalidDomain {
            value: entry.to_string(),
            context: format!("{origin}:{}", idx + 1),
            source: e,
        })?;
        out.insert(host);
    }
    Ok(out)
}
