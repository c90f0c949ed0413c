//! # Host Names and Registrable Domains
//!
//! [`HostName`] is the normalized form of every host the pipeline touches:
//! the site under test, the host that set a cookie, the host a request went
//! to, and every taxonomy pattern.
//!
//! ## Normalization
//!
//! Scheme, user info, path, query, fragment and port are stripped; the host
//! is lowercased and IDNA-encoded (via the `url` crate's WHATWG host parser);
//! leading and trailing dots are removed (cookie hosts are often written
//! `.example.gov`); a single leading `www.` is dropped.
//!
//! ## Registrable Domain
//!
//! The registrable domain is the public suffix plus one label, computed with
//! the `psl` crate. Multi-label government suffixes (`gov.uk`, `gob.mx`,
//! `gob.es`) are therefore handled by the suffix list itself, never by
//! string heuristics. Hosts with no registrable domain (`localhost`, a bare
//! suffix) and IP literals are their own registrable domain.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MAX_HOST_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// A normalized, validated host name or IP literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostName(String);

impl HostName {
    /// Parse a host from a bare host, a `host:port`, or a full URL.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidHost`] when nothing host-like
    /// remains after stripping, or the host violates DNS label rules.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidHost {
            input: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut s = raw.trim();
        if let Some(idx) = s.find("://") {
            s = &s[idx + 3..];
        }
        if let Some(idx) = s.find(['/', '?', '#']) {
            s = &s[..idx];
        }
        if let Some(idx) = s.rfind('@') {
            s = &s[idx + 1..];
        }

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self(ip.to_string()));
        }
        if let Some(rest) = s.strip_prefix('[') {
            let inner = rest.split(']').next().unwrap_or_default();
            return inner
                .parse::<IpAddr>()
                .map(|ip| Self(ip.to_string()))
                .map_err(|_| invalid("malformed bracketed IP literal"));
        }

        let s = strip_port(s).trim_matches('.');
        if s.is_empty() {
            return Err(invalid("empty host"));
        }

        let parsed = url::Host::parse(s).map_err(|e| invalid(&e.to_string()))?;
        match parsed {
            url::Host::Domain(domain) => {
                validate_labels(&domain).map_err(invalid)?;
                Ok(Self(strip_www(domain)))
            }
            url::Host::Ipv4(addr) => Ok(Self(addr.to_string())),
            url::Host::Ipv6(addr) => Ok(Self(addr.to_string())),
        }
    }

    /// Access the normalized host string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this host is an IPv4 or IPv6 literal.
    pub fn is_ip(&self) -> bool {
        self.0.parse::<IpAddr>().is_ok()
    }

    /// The registrable domain (public suffix + one label).
    ///
    /// Falls back to the full host for IP literals and for hosts that have
    /// no registrable domain under the public suffix list.
    pub fn registrable_domain(&self) -> &str {
        if self.is_ip() {
            return &self.0;
        }
        psl::domain_str(&self.0).unwrap_or(&self.0)
    }

    /// The public suffix of this host, if it has one.
    pub fn public_suffix(&self) -> Option<&str> {
        if self.is_ip() {
            return None;
        }
        psl::suffix_str(&self.0)
    }

    /// Whether both hosts share a registrable domain (first-party relation).
    pub fn same_site(&self, other: &HostName) -> bool {
        self.registrable_domain() == other.registrable_domain()
    }

    /// The host followed by each parent domain, ending at the registrable
    /// domain. Never climbs into the public suffix.
    ///
    /// `a.b.example.gov.uk` yields `a.b.example.gov.uk`, `b.example.gov.uk`,
    /// `example.gov.uk`.
    pub fn suffix_chain(&self) -> Vec<&str> {
        let registrable_len = self.registrable_domain().len();
        let mut chain = vec![self.0.as_str()];
        let mut rest = self.0.as_str();
        while rest.len() > registrable_len {
            match rest.find('.') {
                Some(idx) => {
                    rest = &rest[idx + 1..];
                    chain.push(rest);
                }
                None => break,
            }
        }
        chain
    }
}

fn strip_port(s: &str) -> &str {
    match s.split_once(':') {
        Some((head, port))
            if !port.contains(':') && port.chars().all(|c| c.is_ascii_digit()) =>
        {
            head
        }
        _ => s,
    }
}

fn strip_www(domain: String) -> String {
    match domain.strip_prefix("www.") {
        Some(rest) if rest.contains('.') => rest.to_string(),
        _ => domain,
    }
}

fn validate_labels(domain: &str) -> Result<(), &'static str> {
    if domain.len() > MAX_HOST_LEN {
        return Err("host longer than 253 characters");
    }
    for label in domain.split('.') {
        if label.is_empty() {
            return Err("empty label");
        }
        if label.len() > MAX_LABEL_LEN {
            return Err("label longer than 63 characters");
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err("label contains characters outside [a-z0-9-_]");
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err("label starts or ends with a hyphen");
        }
    }
    Ok(())
}

impl TryFrom<String> for HostName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HostName> for String {
    fn from(host: HostName) -> Self {
        host.0
    }
}

impl std::str::FromStr for HostName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for HostName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
