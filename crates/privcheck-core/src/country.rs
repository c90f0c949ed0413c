//! # Country Codes
//!
//! ISO 3166-1 alpha-2 codes, used to group metrics per country and to compare
//! a site's country against tracker owners' countries.
//!
//! A site's country is derived from its public suffix when no explicit
//! mapping exists: the top-level label of a country-code suffix (`gob.mx`
//! gives `MX`), with the IANA exceptions `uk → GB`, and US-only generic
//! TLDs `gov`/`mil → US`. Other generic TLDs give no country.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Two-letter uppercase ISO 3166-1 alpha-2 code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

/// European Union and European Economic Area member states.
const EU_EEA: &[&str] = &[
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "GR", "HR", "HU", "IE",
    "IS", "IT", "LI", "LT", "LU", "LV", "MT", "NL", "NO", "PL", "PT", "RO", "SE", "SI", "SK",
];

impl CountryCode {
    /// Parse a country code, normalizing case.
    ///
    /// `EL` (the EU's code for Greece) is accepted as `GR`.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCountryCode(raw.to_string()));
        }
        if code == "EL" {
            return Ok(Self("GR".to_string()));
        }
        Ok(Self(code))
    }

    /// Derive a country from a public suffix such as `gob.es` or `gov.uk`.
    pub fn from_public_suffix(suffix: &str) -> Option<Self> {
        let tld = suffix.rsplit('.').next()?.to_ascii_lowercase();
        match tld.as_str() {
            "uk" => Some(Self("GB".to_string())),
            "gov" | "mil" => Some(Self("US".to_string())),
            "eu" => None,
            t if t.len() == 2 && t.chars().all(|c| c.is_ascii_lowercase()) => {
                Some(Self(t.to_ascii_uppercase()))
            }
            _ => None,
        }
    }

    /// Access the code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the country is an EU or EEA member state.
    pub fn is_eu_eea(&self) -> bool {
        EU_EEA.contains(&self.0.as_str())
    }
}

impl TryFrom<String> for CountryCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
